//! Error taxonomy shared by the cache, loader, profilers and persistence layer.

use thiserror::Error;

/// Errors produced by the animation asset core.
///
/// Fetch-level variants are usually absorbed by the cache and turned into
/// degraded results; only `AssetNotFound` and `InvalidFrameIndex` reach
/// playback code as hard failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    #[error("Asset not found in catalog: {asset_id}")]
    AssetNotFound { asset_id: String },

    #[error("Frame index {index} out of range for asset {asset_id} ({frame_count} frames)")]
    InvalidFrameIndex {
        asset_id: String,
        index: u32,
        frame_count: u32,
    },

    #[error("Fetch of frame {index} of {asset_id} failed: {reason}")]
    FrameFetchFailed {
        asset_id: String,
        index: u32,
        reason: String,
    },

    #[error("Fetch of frame {index} of {asset_id} timed out after {timeout_ms}ms")]
    FetchTimeout {
        asset_id: String,
        index: u32,
        timeout_ms: u64,
    },

    #[error("Memory budget exceeded after full eviction: {current_bytes} > {max_bytes} bytes")]
    BudgetExceededAfterFullEviction { current_bytes: u64, max_bytes: u64 },

    #[error("Profiler unavailable: {reason}")]
    ProfilerUnavailable { reason: String },

    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl AnimationError {
    /// True for failures of a single frame fetch, which degrade instead of propagating.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AnimationError::FrameFetchFailed { .. } | AnimationError::FetchTimeout { .. }
        )
    }
}

pub type AnimationResult<T> = Result<T, AnimationError>;

impl From<std::io::Error> for AnimationError {
    fn from(err: std::io::Error) -> Self {
        AnimationError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        AnimationError::Persistence {
            reason: err.to_string(),
        }
    }
}

impl From<::config::ConfigError> for AnimationError {
    fn from(err: ::config::ConfigError) -> Self {
        AnimationError::Config {
            reason: err.to_string(),
        }
    }
}
