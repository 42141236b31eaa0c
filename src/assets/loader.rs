//! Frame fetching behind admission control
//!
//! `FrameSource` is the opaque platform primitive that fetches one frame's bytes.
//! `FrameLoader` owns the source together with the `AdmissionGate`, so every
//! fetch goes through a permit, a per-attempt timeout and bounded retries.

use super::gate::AdmissionGate;
use super::types::{Asset, FrameHandle};
use crate::config::LoaderConfig;
use crate::error::{AnimationError, AnimationResult};
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Platform primitive fetching the bytes of a single frame
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn fetch(&self, asset: &Asset, index: u32) -> AnimationResult<Bytes>;
}

/// Reads frames from a directory tree laid out by `Asset::frame_path`
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    root: PathBuf,
}

impl FileFrameSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn fetch(&self, asset: &Asset, index: u32) -> AnimationResult<Bytes> {
        let path = self.root.join(asset.frame_path(index));
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| AnimationError::FrameFetchFailed {
                asset_id: asset.id.to_string(),
                index,
                reason: format!("{}: {}", path.display(), e),
            })?;
        Ok(Bytes::from(data))
    }
}

pub struct FrameLoader {
    source: Arc<dyn FrameSource>,
    gate: AdmissionGate,
    config: LoaderConfig,
}

impl std::fmt::Debug for FrameLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoader")
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish()
    }
}

impl FrameLoader {
    pub fn new(source: Arc<dyn FrameSource>, gate: AdmissionGate, config: LoaderConfig) -> Self {
        Self {
            source,
            gate,
            config,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Fetch one frame, retrying transient failures with exponential backoff
    pub async fn load_frame(&self, asset: &Asset, index: u32) -> AnimationResult<FrameHandle> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(asset, index).await {
                Ok(data) => return Ok(FrameHandle::new(asset.id.clone(), index, data)),
                Err(err) if attempt < self.config.max_retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    debug!(
                        "Retrying frame {}#{} in {:?} (attempt {}/{}): {}",
                        asset.id, index, delay, attempt, self.config.max_retries, err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!("Giving up on frame {}#{}: {}", asset.id, index, err);
                    return Err(err);
                }
            }
        }
    }

    /// One attempt under a permit. The permit is dropped before any backoff sleep.
    async fn fetch_once(&self, asset: &Asset, index: u32) -> AnimationResult<Bytes> {
        let _permit = self.gate.acquire().await;
        let timeout = self.config.fetch_timeout();

        match tokio::time::timeout(timeout, self.source.fetch(asset, index)).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(err)) if err.is_fetch_failure() => Err(err),
            Ok(Err(err)) => Err(AnimationError::FrameFetchFailed {
                asset_id: asset.id.to_string(),
                index,
                reason: err.to_string(),
            }),
            Err(_) => Err(AnimationError::FetchTimeout {
                asset_id: asset.id.to_string(),
                index,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_backoff_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter = if self.config.retry_jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.retry_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}
