//! # Entities
//!
//! Cache levels reconstructed from the jump matrix. At the largest stride every chain slot maps
//! to the same set, so a jump there is a capacity limit: `spots` slots fit, `spots + 1` do not.
//! Those spot counts are the associativity candidates. Walking down the stride table, the first
//! stride at which a candidate's jump disappears is where the slots start spreading over more
//! than one way; the stride just above it times the associativity is the level's size.
use crate::config::stride_bytes_at;
use crate::format_size;
use crate::jumps::JumpMatrix;
use log::{debug, info};
use std::collections::BTreeSet;

/// An inferred cache level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheEntity {
    /// Total size in bytes
    pub size: usize,
    /// Number of ways
    pub associativity: usize,
}

impl CacheEntity {
    /// Per-way span in bytes
    pub fn way_size(&self) -> usize {
        self.size / self.associativity
    }
}

/// Infer cache levels, smallest first
pub fn infer_entities(jumps: &JumpMatrix) -> Vec<CacheEntity> {
    let mut entities = Vec::new();
    let Some(max_index) = jumps.stride_count().checked_sub(1) else {
        return entities;
    };

    let mut candidates: BTreeSet<usize> = jumps.flagged_at(max_index).collect();
    debug!(
        "Associativity candidates at the largest stride: {:?}",
        candidates
    );

    for stride_index in (0..max_index).rev() {
        // each candidate seeds at most one entity, the first clear stride wins
        candidates.retain(|&spots| {
            if jumps.is_set(spots, stride_index) {
                return true;
            }
            let entity = CacheEntity {
                size: spots * stride_bytes_at(stride_index + 1),
                associativity: spots,
            };
            debug!(
                "Jump at {} spots clears below stride index {}: {:?}",
                spots,
                stride_index + 1,
                entity
            );
            entities.push(entity);
            false
        });
    }

    if !candidates.is_empty() {
        debug!(
            "Dropping spot counts whose jump never clears: {:?}",
            candidates
        );
    }

    entities.sort();
    for entity in &entities {
        info!(
            "Found {} {}-way cache",
            format_size(entity.size as f32),
            entity.associativity
        );
    }
    entities
}
