//! Discover the cache hierarchy of this host by timing pointer chases
//!
//! Prints one line per level, smallest first:
//!   L<k> cache size: <bytes>, assoc: <ways>, cache line: <bytes>
//! Diagnostics go to stderr, filtered by `RUST_LOG`.

use cache_calibrator::{CalibrationConfig, CalibrationSession, isolate_current_thread};
use log::{error, info};
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    env_logger::init();
    isolate_current_thread();

    let report = match CalibrationSession::new(CalibrationConfig::default()).and_then(|mut session| session.run()) {
        Ok(report) => report,
        Err(err) => {
            error!("Calibration failed: {}", err);
            return ExitCode::FAILURE;
        }
    };

    info!("Calibration completed with {} levels", report.levels().len());
    print!("{}", report);
    ExitCode::SUCCESS
}
