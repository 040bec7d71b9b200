//! # Session
//!
//! A calibration session owns everything a run needs (configuration, arena and timing harness)
//! and pushes it through the stages in order:
//!
//! latency scan -> jump detection -> entity inference -> line-size inference -> report
//!
//! Every stage hands a new value to the next one; nothing downstream mutates an earlier result.
//! The scan runs on the calling thread only, since a second measuring thread would pollute the
//! very caches being measured.
use crate::arena::Arena;
use crate::config::CalibrationConfig;
use crate::entities::infer_entities;
use crate::error::{CalibrationError, Result};
use crate::harness::{Probe, TimingHarness};
use crate::jumps::JumpMatrix;
use crate::latency::LatencyMatrix;
use crate::line_size::infer_line_sizes;
use crate::report::CacheReport;
use log::{info, warn};

pub struct CalibrationSession<P: Probe = TimingHarness> {
    config: CalibrationConfig,
    probe: P,
}

impl CalibrationSession<TimingHarness> {
    /// Validate `config` and allocate the arena for a hardware-timed session
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        let arena_bytes = config.arena_bytes().ok_or_else(|| {
            CalibrationError::InvalidConfig("arena size overflows usize".to_string())
        })?;
        let arena = Arena::new(arena_bytes)?;
        let probe = TimingHarness::new(arena, config.clone());
        Ok(CalibrationSession { config, probe })
    }
}

impl<P: Probe> CalibrationSession<P> {
    /// Session measuring through an arbitrary probe
    pub fn with_probe(config: CalibrationConfig, probe: P) -> Result<Self> {
        config.validate()?;
        Ok(CalibrationSession { config, probe })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Run the full scan and inference
    pub fn run(&mut self) -> Result<CacheReport> {
        info!(
            "Scanning {} strides x {} spot counts",
            self.config.stride_count, self.config.max_associativity
        );
        let latencies = LatencyMatrix::scan(&mut self.probe, &self.config)?;
        let jumps = JumpMatrix::detect(&latencies, self.config.jump_threshold);

        let entities = infer_entities(&jumps);
        info!("Inferring line sizes for {} levels", entities.len());
        let line_sizes = infer_line_sizes(&mut self.probe, &entities, &self.config)?;

        Ok(CacheReport::new(entities, line_sizes))
    }
}

/// Pin the calling thread to the first available core and raise it to maximum priority, so the
/// scheduler neither migrates nor preempts it mid-scan. Failure only costs accuracy.
pub fn isolate_current_thread() {
    match core_affinity::get_core_ids().and_then(|ids| ids.into_iter().next()) {
        Some(core_id) => {
            if !core_affinity::set_for_current(core_id) {
                warn!(
                    "Couldn't pin calibration thread to CPU core {} (NOTE: this is expected on macOS)",
                    core_id.id
                );
            }
        }
        None => warn!("Couldn't enumerate CPU cores, calibration thread stays unpinned"),
    }

    if thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max).is_err() {
        warn!("Couldn't set calibration thread to maximum thread priority");
    }
}
