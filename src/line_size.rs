//! # Line size
//!
//! For each level, chains are laid out at the per-way stride plus a small offset `L`. While `L`
//! stays inside one line per way the slots keep aliasing into the same sets and latency jumps at
//! a small spot count; once `L × associativity` reaches the line size the slots spread out and the
//! first jump moves to a larger spot count. That shift is what gets reported.
use crate::config::{CalibrationConfig, LineSweep};
use crate::entities::CacheEntity;
use crate::error::Result;
use crate::harness::Probe;
use crate::jumps::is_jump;
use log::{debug, info};

/// Line-size candidates for one cache level, in the order they were detected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSize {
    candidates: Vec<usize>,
}

impl LineSize {
    pub fn new(candidates: Vec<usize>) -> Self {
        LineSize { candidates }
    }

    /// The first detected line size in bytes
    pub fn bytes(&self) -> Option<usize> {
        self.candidates.first().copied()
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }
}

/// Line size of every entity, index-parallel to `entities`
pub fn infer_line_sizes<P: Probe>(
    probe: &mut P,
    entities: &[CacheEntity],
    config: &CalibrationConfig,
) -> Result<Vec<LineSize>> {
    entities
        .iter()
        .map(|entity| infer_line_size(probe, entity, config))
        .collect()
}

pub fn infer_line_size<P: Probe>(
    probe: &mut P,
    entity: &CacheEntity,
    config: &CalibrationConfig,
) -> Result<LineSize> {
    let way_size = entity.way_size();
    let mut candidates = Vec::new();
    let mut previous_first_jump = None;
    let mut offset = 1;

    while offset <= way_size {
        let first_jump = first_jump(probe, way_size + offset, config)?;
        debug!(
            "{:?}: offset {} B first jumps at {:?} spots",
            entity, offset, first_jump
        );

        // an unknown index on either side (sweep cut short by the arena) proves nothing
        if let (Some(previous), Some(current)) = (previous_first_jump, first_jump) {
            if current > previous {
                candidates.push(offset * entity.associativity);
                if config.line_sweep == LineSweep::FirstIncrease {
                    break;
                }
            }
        }
        previous_first_jump = first_jump;
        offset <<= 1;
    }

    if candidates.len() > 1 {
        debug!(
            "{:?}: several line size candidates {:?}, reporting the first",
            entity, candidates
        );
    }
    match candidates.first() {
        Some(line) => info!("{}-way level of {} B: {} B lines", entity.associativity, entity.size, line),
        None => info!("{}-way level of {} B: no line size detected", entity.associativity, entity.size),
    }
    Ok(LineSize::new(candidates))
}

/// Where latency first jumps while doubling the spot count at a fixed stride
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FirstJump {
    /// Latency jumped going from half this many spots to this many
    At(usize),
    /// No jump up to `line_probe_max_spots`; ranks above every `At`
    Beyond,
}

/// First spot count (1, 2, 4, ...) whose latency jumps relative to the previous one, or `None`
/// if the arena ran out before the sweep could finish
fn first_jump<P: Probe>(
    probe: &mut P,
    stride: usize,
    config: &CalibrationConfig,
) -> Result<Option<FirstJump>> {
    let mut previous = None;
    let mut spots = 1;

    while spots <= config.line_probe_max_spots {
        let fits = stride
            .checked_mul(spots)
            .is_some_and(|range| range <= probe.capacity());
        if !fits {
            debug!(
                "Stopping sweep at stride {} B: {} spots exceed the arena",
                stride, spots
            );
            return Ok(None);
        }

        let latency = probe.measure(stride, spots)?;
        if let Some(previous) = previous {
            if is_jump(latency, previous, config.jump_threshold) {
                return Ok(Some(FirstJump::At(spots)));
            }
        }
        previous = Some(latency);
        spots <<= 1;
    }
    Ok(Some(FirstJump::Beyond))
}
