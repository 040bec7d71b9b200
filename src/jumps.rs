use crate::latency::LatencyMatrix;
use log::debug;

/// True when two latency samples differ by more than `threshold`
pub fn is_jump(current: u64, previous: u64, threshold: u64) -> bool {
    current.abs_diff(previous) > threshold
}

/// Latency discontinuities across spot counts.
///
/// A flag at `(spots, stride_index)` means latency jumped between `spots` and `spots + 1` slots
/// at that stride, i.e. `spots` slots still fit and one more did not. The largest spot count has
/// no successor and is never flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpMatrix {
    max_spots: usize,
    stride_count: usize,
    flags: Vec<bool>,
}

impl JumpMatrix {
    /// Compare each spot count with the next one, stride by stride
    pub fn detect(latencies: &LatencyMatrix, threshold: u64) -> Self {
        let mut jumps = JumpMatrix::empty(latencies.max_spots(), latencies.stride_count());

        for stride_index in 0..jumps.stride_count {
            for spots in 1..jumps.max_spots {
                let previous = latencies.get(spots, stride_index);
                let current = latencies.get(spots + 1, stride_index);
                if is_jump(current, previous, threshold) {
                    debug!(
                        "Jump at stride index {} between {} and {} spots ({} -> {})",
                        stride_index,
                        spots,
                        spots + 1,
                        previous,
                        current
                    );
                    jumps.set(spots, stride_index);
                }
            }
        }
        jumps
    }

    /// Matrix with exactly the given `(spots, stride_index)` flags set
    pub fn from_flags(max_spots: usize, stride_count: usize, flags: &[(usize, usize)]) -> Self {
        let mut jumps = JumpMatrix::empty(max_spots, stride_count);
        for &(spots, stride_index) in flags {
            jumps.set(spots, stride_index);
        }
        jumps
    }

    fn empty(max_spots: usize, stride_count: usize) -> Self {
        JumpMatrix {
            max_spots,
            stride_count,
            flags: vec![false; max_spots * stride_count],
        }
    }

    fn set(&mut self, spots: usize, stride_index: usize) {
        assert!(
            (1..self.max_spots).contains(&spots) && stride_index < self.stride_count,
            "jump flag ({}, {}) outside {}x{} matrix",
            spots,
            stride_index,
            self.max_spots,
            self.stride_count
        );
        self.flags[(spots - 1) * self.stride_count + stride_index] = true;
    }

    /// Whether latency jumped going from `spots` to `spots + 1` at `stride_index`
    pub fn is_set(&self, spots: usize, stride_index: usize) -> bool {
        if spots == 0 || spots > self.max_spots || stride_index >= self.stride_count {
            return false;
        }
        self.flags[(spots - 1) * self.stride_count + stride_index]
    }

    pub fn max_spots(&self) -> usize {
        self.max_spots
    }

    pub fn stride_count(&self) -> usize {
        self.stride_count
    }

    /// Spot counts flagged at `stride_index`, ascending
    pub fn flagged_at(&self, stride_index: usize) -> impl Iterator<Item = usize> + '_ {
        (1..self.max_spots).filter(move |&spots| self.is_set(spots, stride_index))
    }
}
