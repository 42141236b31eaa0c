//! Small key-value store for controller state kept across sessions

use crate::error::{AnimationError, AnimationResult};
use crate::quality::QualityTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Key under which the quality record is stored
pub const QUALITY_STATE_KEY: &str = "quality_state";

/// Last known tier and device benchmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
    pub tier: QualityTier,
    pub compute_score: f32,
    /// Seconds since the unix epoch
    pub timestamp: u64,
}

impl QualityRecord {
    pub fn now(tier: QualityTier, compute_score: f32) -> Self {
        Self {
            tier,
            compute_score,
            timestamp: unix_now(),
        }
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.timestamp))
    }

    /// Younger than `ttl`; records from the future count as stale
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.timestamp <= unix_now() && self.age() < ttl
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> AnimationResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> AnimationResult<()>;
}

/// One `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &str) -> AnimationResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AnimationError::Persistence {
                reason: format!("reading {}: {}", key, e),
            }),
        }
    }

    fn save(&self, key: &str, value: &str) -> AnimationResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        debug!("Persisted {} to {}", key, path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> AnimationResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> AnimationResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn load_quality_record(store: &dyn StateStore) -> AnimationResult<Option<QualityRecord>> {
    match store.load(QUALITY_STATE_KEY)? {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

pub fn save_quality_record(store: &dyn StateStore, record: &QualityRecord) -> AnimationResult<()> {
    let data = serde_json::to_string(record)?;
    store.save(QUALITY_STATE_KEY, &data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state"));
        assert_eq!(load_quality_record(&store).unwrap(), None);

        let record = QualityRecord::now(QualityTier::High, 0.72);
        save_quality_record(&store, &record).unwrap();
        assert_eq!(load_quality_record(&store).unwrap(), Some(record));
        assert!(dir.path().join("state/quality_state.json").exists());
    }

    #[test]
    fn test_corrupt_record_is_a_persistence_error() {
        let store = MemoryStateStore::new();
        store.save(QUALITY_STATE_KEY, "{not json").unwrap();
        assert!(matches!(
            load_quality_record(&store),
            Err(AnimationError::Persistence { .. })
        ));
    }

    #[test]
    fn test_record_freshness() {
        let ttl = Duration::from_secs(24 * 60 * 60);
        let mut record = QualityRecord::now(QualityTier::Medium, 0.4);
        assert!(record.is_fresh(ttl));

        record.timestamp -= 25 * 60 * 60;
        assert!(!record.is_fresh(ttl));

        record.timestamp = unix_now() + 3600;
        assert!(!record.is_fresh(ttl));
    }

    #[test]
    fn test_record_json_shape() {
        let record = QualityRecord { tier: QualityTier::Ultra, compute_score: 0.5, timestamp: 42 };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"tier":"ultra","compute_score":0.5,"timestamp":42}"#);
    }
}
