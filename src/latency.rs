//! # Latency matrix
//!
//! Best-case per-hop latency for every (spot count, stride) pair of the scan. The matrix is filled
//! completely by [`LatencyMatrix::scan`] before anything downstream reads it.
use crate::config::{CalibrationConfig, stride_bytes_at};
use crate::error::Result;
use crate::format_size_fixed_int;
use crate::harness::Probe;
use log::{debug, info};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyMatrix {
    max_spots: usize,
    stride_count: usize,
    /// Row-major: one row per spot count, one column per stride index
    samples: Vec<u64>,
}

impl LatencyMatrix {
    /// Build a matrix from a latency function of `(spots, stride_index)`, spots starting at 1
    pub fn from_fn<F>(max_spots: usize, stride_count: usize, mut latency: F) -> Self
    where
        F: FnMut(usize, usize) -> u64,
    {
        let mut samples = Vec::with_capacity(max_spots * stride_count);
        for spots in 1..=max_spots {
            for stride_index in 0..stride_count {
                samples.push(latency(spots, stride_index));
            }
        }
        LatencyMatrix {
            max_spots,
            stride_count,
            samples,
        }
    }

    /// Time every spot count at every stride of the table
    pub fn scan<P: Probe>(probe: &mut P, config: &CalibrationConfig) -> Result<Self> {
        let max_spots = config.max_associativity;
        let stride_count = config.stride_count;
        let mut samples = vec![0; max_spots * stride_count];

        // Stride-major so consecutive measurements reuse the same chain spacing
        for stride_index in 0..stride_count {
            let stride = stride_bytes_at(stride_index);
            info!(
                "Timing stride {} ({}/{})",
                format_size_fixed_int(stride as u64).trim_start(),
                stride_index + 1,
                stride_count
            );
            for spots in 1..=max_spots {
                samples[(spots - 1) * stride_count + stride_index] = probe.measure(stride, spots)?;
            }
        }

        let matrix = LatencyMatrix {
            max_spots,
            stride_count,
            samples,
        };
        debug!("Latency table:\n{}", matrix);
        Ok(matrix)
    }

    /// Latency measured with `spots` slots at `stride_index`
    pub fn get(&self, spots: usize, stride_index: usize) -> u64 {
        self.samples[(spots - 1) * self.stride_count + stride_index]
    }

    pub fn max_spots(&self) -> usize {
        self.max_spots
    }

    pub fn stride_count(&self) -> usize {
        self.stride_count
    }
}

/// Human-readable table, strides across and spot counts down
impl fmt::Display for LatencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "SPOTS")?;
        for stride_index in 0..self.stride_count {
            write!(
                f,
                " {:>9}",
                format_size_fixed_int(stride_bytes_at(stride_index) as u64)
            )?;
        }
        writeln!(f)?;
        for spots in 1..=self.max_spots {
            write!(f, "{:>6}", spots)?;
            for stride_index in 0..self.stride_count {
                write!(f, " {:>9}", self.get(spots, stride_index))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Latency is a pure function of the chain shape
    struct ShapeProbe {
        calls: Vec<(usize, usize)>,
    }

    impl Probe for ShapeProbe {
        fn measure(&mut self, stride: usize, spots: usize) -> Result<u64> {
            self.calls.push((stride, spots));
            Ok((stride * 10 + spots) as u64)
        }

        fn capacity(&self) -> usize {
            usize::MAX
        }
    }

    #[test]
    fn scan_fills_every_cell() {
        let config = CalibrationConfig::new().stride_count(3).max_associativity(4);
        let mut probe = ShapeProbe { calls: Vec::new() };

        let matrix = LatencyMatrix::scan(&mut probe, &config).unwrap();

        assert_eq!(probe.calls.len(), 12);
        assert_eq!(probe.calls[0], (64, 1));
        assert_eq!(probe.calls[4], (128, 1));
        assert_eq!(matrix.max_spots(), 4);
        assert_eq!(matrix.stride_count(), 3);
        for spots in 1..=4 {
            for stride_index in 0..3 {
                assert_eq!(
                    matrix.get(spots, stride_index),
                    (stride_bytes_at(stride_index) * 10 + spots) as u64
                );
            }
        }
    }

    #[test]
    fn table_lists_strides_and_spots() {
        let matrix = LatencyMatrix::from_fn(2, 2, |spots, stride_index| (spots * 100 + stride_index) as u64);
        let table = matrix.to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("64 B"));
        assert!(lines[0].contains("128 B"));
        assert!(lines[1].trim_start().starts_with('1'));
        assert!(lines[2].ends_with("201"));
    }
}
