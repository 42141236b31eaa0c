//! Eviction policy for the frame cache.
//!
//! Pressure is spread over several assets: each candidate loses a fraction of its
//! resident frames before the scan moves on, so a partially evicted asset can still
//! loop on what remains.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Order in which unpinned entries are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionOrder {
    /// Least recently accessed first
    OldestFirst,
    /// Most resident bytes first
    LargestFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionPolicy {
    /// Eviction stops once resident bytes reach `floor_ratio * max_bytes`
    pub floor_ratio: f64,
    /// Share of a candidate's frames freed per visit
    pub fraction: f64,
    pub order: EvictionOrder,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            floor_ratio: 0.7,
            fraction: 0.5,
            order: EvictionOrder::OldestFirst,
        }
    }
}

/// What the policy needs to know about an entry
#[derive(Debug, Clone)]
pub struct EvictionCandidate<K> {
    pub key: K,
    pub last_accessed_at: Instant,
    pub access_seq: u64,
    pub resident_bytes: u64,
}

impl EvictionPolicy {
    pub fn target_floor(&self, max_bytes: u64) -> u64 {
        (max_bytes as f64 * self.floor_ratio.clamp(0.0, 1.0)) as u64
    }

    /// Sort candidates into visiting order
    pub fn order_candidates<K>(&self, candidates: &mut [EvictionCandidate<K>]) {
        match self.order {
            EvictionOrder::OldestFirst => candidates.sort_by(|a, b| {
                a.last_accessed_at
                    .cmp(&b.last_accessed_at)
                    .then(a.access_seq.cmp(&b.access_seq))
            }),
            EvictionOrder::LargestFirst => candidates.sort_by(|a, b| {
                b.resident_bytes
                    .cmp(&a.resident_bytes)
                    .then(a.access_seq.cmp(&b.access_seq))
            }),
        }
    }

    /// Number of frames to free from an entry holding `resident` frames
    pub fn frames_to_free(&self, resident: usize) -> usize {
        if resident == 0 {
            return 0;
        }
        let count = (resident as f64 * self.fraction.clamp(0.0, 1.0)).ceil() as usize;
        count.clamp(1, resident)
    }

    /// Frame indices to drop, in removal order. Every other frame goes first
    /// (odd positions, from the end), then the remaining positions from the end.
    pub fn select_frames(&self, sorted_indices: &[u32]) -> Vec<u32> {
        let count = self.frames_to_free(sorted_indices.len());
        let odd = sorted_indices.iter().enumerate().rev().filter(|(pos, _)| pos % 2 == 1);
        let even = sorted_indices.iter().enumerate().rev().filter(|(pos, _)| pos % 2 == 0);
        odd.chain(even).map(|(_, index)| *index).take(count).collect()
    }
}
