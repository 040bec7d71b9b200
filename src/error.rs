use crate::format_size_fixed_int;

/// Errors that stop a calibration run.
///
/// Measurement noise and ambiguous associativity probes are not errors: the
/// first is absorbed by best-of-N sampling, the second only shrinks the
/// reported hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    /// The memory arena could not be allocated
    InsufficientMemory { requested: usize },
    /// A pointer chain would extend past the end of the arena
    ChainOutOfBounds {
        stride: usize,
        spots: usize,
        capacity: usize,
    },
    /// Trials stayed below the reliable-duration floor until the hop
    /// multiplier overflowed
    TimerUnresolvable { min_reliable_ns: u64 },
    /// A configuration value is outside its usable range
    InvalidConfig(String),
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationError::InsufficientMemory { requested } => write!(
                f,
                "insufficient memory: could not allocate a {} arena",
                format_size_fixed_int(*requested as u64).trim_start()
            ),
            CalibrationError::ChainOutOfBounds {
                stride,
                spots,
                capacity,
            } => write!(
                f,
                "pointer chain of {} spots at stride {} B does not fit in a {} B arena",
                spots, stride, capacity
            ),
            CalibrationError::TimerUnresolvable { min_reliable_ns } => write!(
                f,
                "timer could not resolve a trial above {} ns before the hop multiplier overflowed",
                min_reliable_ns
            ),
            CalibrationError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for CalibrationError {}

pub type Result<T> = std::result::Result<T, CalibrationError>;
