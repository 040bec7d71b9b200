//! Cache hierarchy discovery by timing pointer chases.
//!
//! Levels, sizes, associativities and line sizes are inferred purely from how access latency
//! reacts to chain stride and length, without asking the OS or CPUID.
pub mod arena;
pub mod config;
pub mod entities;
pub mod error;
pub mod harness;
pub mod jumps;
pub mod latency;
pub mod line_size;
pub mod report;
pub mod session;

pub use config::{CalibrationConfig, LineSweep};
pub use entities::CacheEntity;
pub use error::{CalibrationError, Result};
pub use line_size::LineSize;
pub use report::{CacheLevel, CacheReport};
pub use session::{CalibrationSession, isolate_current_thread};

/// Convert number of bytes to formatted string
pub fn format_size(bytes: f32) -> String {
    const GB: f32 = 1024.0 * 1024.0 * 1024.0;
    const MB: f32 = 1024.0 * 1024.0;
    const KB: f32 = 1024.0;

    if bytes >= GB {
        format!("{:.2} GiB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes / KB)
    } else {
        format!("{:.2} B", bytes)
    }
}

/// Convert number of bytes to formatted string for fixed-width integer string
pub fn format_size_fixed_int(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:>4} GiB", bytes / GB)
    } else if bytes >= MB {
        format!("{:>4} MiB", bytes / MB)
    } else if bytes >= KB {
        format!("{:>4} KiB", bytes / KB)
    } else {
        format!("{:>4} B", bytes)
    }
}
