//! Asset descriptors and frame handles
//!
//! Shared types used throughout the frame cache. Every loadable animation is
//! described by a single `Asset`; emoji, theme and effect animations differ only
//! in their `category` tag.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an animation asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Declared importance of an asset, used for preload planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Default for PriorityTier {
    fn default() -> Self {
        Self::Medium
    }
}

/// Kind of animation an asset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Emoji,
    Theme,
    Effect,
}

impl AssetCategory {
    /// Directory segment used when resolving frame paths
    pub fn path_segment(&self) -> &'static str {
        match self {
            AssetCategory::Emoji => "emoji",
            AssetCategory::Theme => "themes",
            AssetCategory::Effect => "effects",
        }
    }
}

/// Immutable catalog description of a loadable animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Theme or pack the asset belongs to
    pub group_id: String,
    pub category: AssetCategory,
    pub frame_count: u32,
    pub estimated_bytes_per_frame: u64,
    pub priority: PriorityTier,
    /// Part of the essential "preload on start" set; never evicted by pressure
    #[serde(default)]
    pub pinned: bool,
}

impl Asset {
    pub fn new(
        id: impl Into<AssetId>,
        group_id: impl Into<String>,
        category: AssetCategory,
        frame_count: u32,
        estimated_bytes_per_frame: u64,
        priority: PriorityTier,
    ) -> Self {
        Self {
            id: id.into(),
            group_id: group_id.into(),
            category,
            frame_count,
            estimated_bytes_per_frame,
            priority,
            pinned: false,
        }
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// Relative path of one frame, identical for every category
    pub fn frame_path(&self, index: u32) -> String {
        format!(
            "{}/{}/{}/{:04}.png",
            self.category.path_segment(),
            self.group_id,
            self.id,
            index
        )
    }

    /// Estimated size of the full sequence when resident
    pub fn estimated_total_bytes(&self) -> u64 {
        self.estimated_bytes_per_frame * self.frame_count as u64
    }

    pub fn contains_frame(&self, index: u32) -> bool {
        index < self.frame_count
    }
}

/// Key of a single frame: (asset, frame index)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    pub asset_id: AssetId,
    pub index: u32,
}

impl FrameKey {
    pub fn new(asset_id: AssetId, index: u32) -> Self {
        Self { asset_id, index }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.asset_id, self.index)
    }
}

/// Handle to one frame's data. Cloning is cheap (reference counted bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHandle {
    pub asset_id: AssetId,
    pub index: u32,
    pub data: Bytes,
    /// Set on synthetic frames standing in for a frame that could not be loaded
    pub is_placeholder: bool,
}

impl FrameHandle {
    pub fn new(asset_id: AssetId, index: u32, data: Bytes) -> Self {
        Self {
            asset_id,
            index,
            data,
            is_placeholder: false,
        }
    }

    /// Empty frame used when nothing better is available
    pub fn placeholder(asset_id: AssetId, index: u32) -> Self {
        Self {
            asset_id,
            index,
            data: Bytes::new(),
            is_placeholder: true,
        }
    }

    /// Bytes accounted against the memory budget
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// How much of an asset is resident
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Partial,
    Complete,
}
