//! Access latency measurement via pointer chasing
//!
//! A chain of `spots` slots spaced `stride` bytes apart is written into the arena, each slot
//! holding the byte offset of the next one. Walking the chain makes every load depend on the
//! previous one, and the offsets are fixed at setup time rather than computed in the loop, so the
//! timed region measures cache/memory latency instead of prefetcher throughput.
//!
//! Each measurement keeps the fastest of `trial_count` trials: anything slower was disturbed by
//! the scheduler or foreign cache traffic.

use crate::arena::{Arena, LINK_BYTES};
use crate::config::CalibrationConfig;
use crate::error::{CalibrationError, Result};
use log::trace;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Process-visible sink for chase results
static OBSERVED: AtomicUsize = AtomicUsize::new(0);

/// Consume a chase result so the optimizer cannot drop the loop that produced it
#[inline(never)]
pub fn observe(value: usize) {
    OBSERVED.fetch_add(black_box(value), Ordering::Relaxed);
}

/// Anything that can report a per-hop latency for a (stride, spots) chain
pub trait Probe {
    /// Best-case latency, in latency units, of a chain of `spots` slots `stride` bytes apart
    fn measure(&mut self, stride: usize, spots: usize) -> Result<u64>;

    /// Largest chain range in bytes this probe can lay out
    fn capacity(&self) -> usize;
}

/// One timed run of a pointer chase
pub trait TrialSource {
    /// Walk `hops` links and return the wall-clock duration in nanoseconds
    fn run_trial(&mut self, hops: u64) -> u64;
}

/// Best-of-N trial selection.
///
/// A trial at or below `min_reliable_duration_ns` is thrown away and redone with twice as many
/// hops; it does not count towards `trial_count`. Kept durations are normalized by the hop
/// multiplier in effect, and the minimum is scaled by `latency_divisor`.
pub fn best_trial<S: TrialSource>(source: &mut S, config: &CalibrationConfig) -> Result<u64> {
    let unresolvable = CalibrationError::TimerUnresolvable {
        min_reliable_ns: config.min_reliable_duration_ns,
    };
    let mut multiplier: u64 = 1;
    let mut best = u64::MAX;
    let mut kept = 0;

    while kept < config.trial_count {
        let hops = config
            .hops_per_trial
            .checked_mul(multiplier)
            .ok_or_else(|| unresolvable.clone())?;
        let elapsed_ns = source.run_trial(hops);

        if elapsed_ns <= config.min_reliable_duration_ns {
            multiplier = multiplier
                .checked_mul(2)
                .ok_or_else(|| unresolvable.clone())?;
            trace!(
                "Trial of {} hops took {} ns, retrying with multiplier {}",
                hops, elapsed_ns, multiplier
            );
            continue;
        }

        best = best.min(elapsed_ns / multiplier);
        kept += 1;
    }

    Ok(best / config.latency_divisor)
}

/// Follow `hops` links starting at byte `offset` of `base`, returning where the walk ended
#[inline(never)]
fn chase(base: *const u8, mut offset: usize, hops: u64) -> usize {
    // SAFETY: the caller laid out a closed chain inside the allocation behind `base`, so every
    // offset reached is the start of an in-bounds link
    macro_rules! hop {
        () => {
            offset = unsafe { base.add(offset).cast::<usize>().read_unaligned() };
        };
    }

    let mut remaining = hops;
    while remaining >= 10 {
        // Unroll 10x to reduce loop overhead relative to memory latency
        hop!();
        hop!();
        hop!();
        hop!();
        hop!();
        hop!();
        hop!();
        hop!();
        hop!();
        hop!();
        remaining -= 10;
    }
    while remaining > 0 {
        hop!();
        remaining -= 1;
    }
    offset
}

/// A closed chain laid out in an arena, timed with the monotonic clock
struct Chain<'a> {
    arena: &'a Arena,
    position: usize,
}

impl TrialSource for Chain<'_> {
    fn run_trial(&mut self, hops: u64) -> u64 {
        let start = Instant::now();
        let end = black_box(chase(self.arena.as_ptr(), self.position, hops));
        let elapsed = start.elapsed();

        observe(end);
        self.position = end;
        elapsed.as_nanos() as u64
    }
}

/// Timing harness owning the arena every chain is laid out in
pub struct TimingHarness {
    arena: Arena,
    config: CalibrationConfig,
}

impl TimingHarness {
    pub fn new(arena: Arena, config: CalibrationConfig) -> Self {
        TimingHarness { arena, config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Write a circular chain of `spots` slots: each slot links to the one `stride` bytes below
    /// it and the first slot links back to the last. Returns the offset of the last slot.
    fn lay_chain(&mut self, stride: usize, spots: usize) -> Result<usize> {
        let out_of_bounds = CalibrationError::ChainOutOfBounds {
            stride,
            spots,
            capacity: self.arena.len(),
        };
        if spots == 0 {
            return Err(CalibrationError::InvalidConfig(
                "a chain needs at least one spot".to_string(),
            ));
        }

        let last = (spots - 1)
            .checked_mul(stride)
            .ok_or_else(|| out_of_bounds.clone())?;
        match last.checked_add(LINK_BYTES) {
            Some(end) if end <= self.arena.len() => {}
            _ => return Err(out_of_bounds),
        }

        self.arena.write_link(0, last);
        for slot in 1..spots {
            self.arena.write_link(slot * stride, (slot - 1) * stride);
        }
        Ok(last)
    }
}

impl Probe for TimingHarness {
    fn measure(&mut self, stride: usize, spots: usize) -> Result<u64> {
        let head = self.lay_chain(stride, spots)?;
        let mut chain = Chain {
            arena: &self.arena,
            position: head,
        };

        // Untimed pass so page faults and TLB fills stay out of the first trial
        chain.position = chase(self.arena.as_ptr(), chain.position, spots as u64);

        let latency = best_trial(&mut chain, &self.config)?;
        trace!("stride {:>7} B, spots {:>3}: {}", stride, spots, latency);
        Ok(latency)
    }

    fn capacity(&self) -> usize {
        self.arena.len()
    }
}
