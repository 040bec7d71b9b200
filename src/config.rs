//! Tunables for a calibration run.
//!
//! Every constant the scan depends on lives here so it can be retuned per
//! target hardware and timer resolution.

use crate::error::{CalibrationError, Result};

/// Smallest stride of the table is `2^MIN_STRIDE_EXPONENT` bytes (64 B)
pub const MIN_STRIDE_EXPONENT: u32 = 6;

/// How line-size inference treats further increases after the first one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineSweep {
    /// Sweep every candidate line size and keep each qualifying increase
    #[default]
    AllIncreases,
    /// Stop an entity's sweep at its first qualifying increase
    FirstIncrease,
}

/// Configuration for a [`CalibrationSession`](crate::session::CalibrationSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationConfig {
    /// Latency difference (in latency units) that counts as a jump (default: 50)
    pub jump_threshold: u64,

    /// Raw trial duration in nanoseconds at or below which a trial is
    /// redone with twice the hops (default: 10,000)
    pub min_reliable_duration_ns: u64,

    /// Trials kept per measurement; the fastest one wins (default: 20)
    pub trial_count: u32,

    /// Pointer-chase hops per trial before any doubling (default: 100,000)
    pub hops_per_trial: u64,

    /// Number of entries in the stride table; the largest stride is
    /// `2^(stride_count + 5)` bytes (default: 14, i.e. 512 KiB)
    pub stride_count: usize,

    /// Largest spot count probed per stride (default: 20)
    pub max_associativity: usize,

    /// Headroom factor applied to the arena size (default: 16)
    pub arena_safety_multiplier: usize,

    /// Divisor applied to the best per-trial duration (default: 1000)
    pub latency_divisor: u64,

    /// Upper bound of the spot-count sweep during line-size inference (default: 512)
    pub line_probe_max_spots: usize,

    /// Line-size candidate policy (default: [`LineSweep::AllIncreases`])
    pub line_sweep: LineSweep,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            jump_threshold: 50,
            min_reliable_duration_ns: 10_000,
            trial_count: 20,
            hops_per_trial: 100_000,
            stride_count: 14,
            max_associativity: 20,
            arena_safety_multiplier: 16,
            latency_divisor: 1000,
            line_probe_max_spots: 512,
            line_sweep: LineSweep::AllIncreases,
        }
    }
}

impl CalibrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jump_threshold(mut self, threshold: u64) -> Self {
        self.jump_threshold = threshold;
        self
    }

    pub fn min_reliable_duration_ns(mut self, ns: u64) -> Self {
        self.min_reliable_duration_ns = ns;
        self
    }

    pub fn trial_count(mut self, trials: u32) -> Self {
        self.trial_count = trials;
        self
    }

    pub fn hops_per_trial(mut self, hops: u64) -> Self {
        self.hops_per_trial = hops;
        self
    }

    pub fn stride_count(mut self, count: usize) -> Self {
        self.stride_count = count;
        self
    }

    pub fn max_associativity(mut self, assoc: usize) -> Self {
        self.max_associativity = assoc;
        self
    }

    pub fn arena_safety_multiplier(mut self, multiplier: usize) -> Self {
        self.arena_safety_multiplier = multiplier;
        self
    }

    pub fn latency_divisor(mut self, divisor: u64) -> Self {
        self.latency_divisor = divisor;
        self
    }

    pub fn line_probe_max_spots(mut self, spots: usize) -> Self {
        self.line_probe_max_spots = spots;
        self
    }

    pub fn line_sweep(mut self, sweep: LineSweep) -> Self {
        self.line_sweep = sweep;
        self
    }

    /// Stride in bytes of the largest entry in the stride table
    pub fn max_stride(&self) -> usize {
        stride_bytes_at(self.stride_count.saturating_sub(1))
    }

    /// Bytes the arena must hold for the densest chain of the scan
    pub fn arena_bytes(&self) -> Option<usize> {
        self.max_associativity
            .checked_mul(self.max_stride())?
            .checked_mul(self.arena_safety_multiplier)
    }

    /// Reject values that would make the scan meaningless or unbounded
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CalibrationError::InvalidConfig(msg.to_string()));

        if self.trial_count == 0 {
            return invalid("trial_count must be at least 1");
        }
        if self.hops_per_trial == 0 {
            return invalid("hops_per_trial must be at least 1");
        }
        if self.latency_divisor == 0 {
            return invalid("latency_divisor must be at least 1");
        }
        if self.stride_count == 0 {
            return invalid("stride_count must be at least 1");
        }
        // 2^(index + 6) has to fit in a usize
        if self.stride_count + MIN_STRIDE_EXPONENT as usize > usize::BITS as usize - 1 {
            return invalid("stride_count exceeds the addressable stride range");
        }
        if self.max_associativity < 2 {
            return invalid("max_associativity must be at least 2 to observe a jump");
        }
        if self.arena_safety_multiplier == 0 {
            return invalid("arena_safety_multiplier must be at least 1");
        }
        if self.line_probe_max_spots == 0 {
            return invalid("line_probe_max_spots must be at least 1");
        }
        if self.arena_bytes().is_none() {
            return invalid("arena size overflows usize");
        }
        Ok(())
    }
}

/// Stride in bytes at `index` of the exponential stride table: `2^(index + 6)`
pub const fn stride_bytes_at(index: usize) -> usize {
    1 << (index as u32 + MIN_STRIDE_EXPONENT)
}
