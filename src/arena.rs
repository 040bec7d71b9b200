//! # Arena
//!
//! One flat byte buffer that every pointer chain of a run is laid out in. It carries no
//! structure of its own; the timing harness overwrites it with a fresh chain before each
//! measurement.
use crate::error::{CalibrationError, Result};
use crate::format_size;
use log::debug;

pub struct Arena {
    bytes: Vec<u8>,
}

impl Arena {
    /// Allocate a zeroed arena of `len` bytes, reporting allocation failure instead of aborting
    pub fn new(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| CalibrationError::InsufficientMemory { requested: len })?;
        // Zero-filling also faults every page in before the first measurement
        bytes.resize(len, 0);
        debug!("Allocated {} arena", format_size(len as f32));
        Ok(Arena { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Store `next` at byte `offset`, unaligned. Panics if the word would not fit.
    pub fn write_link(&mut self, offset: usize, next: usize) {
        self.bytes[offset..offset + LINK_BYTES].copy_from_slice(&next.to_ne_bytes());
    }

    /// Read back the word stored at byte `offset`
    pub fn read_link(&self, offset: usize) -> usize {
        let mut word = [0u8; LINK_BYTES];
        word.copy_from_slice(&self.bytes[offset..offset + LINK_BYTES]);
        usize::from_ne_bytes(word)
    }
}

/// Bytes taken by one chain link
pub const LINK_BYTES: usize = std::mem::size_of::<usize>();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_requested_length() {
        let arena = Arena::new(4096).unwrap();
        assert_eq!(arena.len(), 4096);
        assert!(!arena.is_empty());
    }

    #[test]
    fn links_round_trip_at_odd_offsets() {
        let mut arena = Arena::new(256).unwrap();
        arena.write_link(65, 130);
        arena.write_link(130, 65);
        assert_eq!(arena.read_link(65), 130);
        assert_eq!(arena.read_link(130), 65);
    }

    #[test]
    fn impossible_allocation_is_reported() {
        let err = Arena::new(usize::MAX).err().unwrap();
        assert_eq!(
            err,
            CalibrationError::InsufficientMemory {
                requested: usize::MAX
            }
        );
    }
}
