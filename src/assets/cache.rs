//! Memory-budgeted frame cache
//!
//! Owns every resident frame. All mutation of entries, the memory budget, the
//! in-flight job table and the counters happens under one `RwLock`, so byte
//! accounting is updated atomically with each insert or eviction and no caller
//! can observe an intermediate state. The lock is never held across an await.
//!
//! Missing frames are fetched through `FrameLoader` (and so through the
//! admission gate). Concurrent requests for the same `(asset, frame)` share one
//! `LoadingJob`; the frame is inserted and the job retired in the same critical
//! section.

use super::catalog::AssetCatalog;
use super::eviction::{EvictionCandidate, EvictionPolicy};
use super::gate::AdmissionGate;
use super::loader::{FrameLoader, FrameSource};
use super::planner::PreloadPlanner;
use super::types::{Asset, AssetId, FrameHandle, FrameKey, LoadState, PriorityTier};
use crate::config::{CacheConfig, LoaderConfig};
use crate::error::{AnimationError, AnimationResult};
use crate::quality::QualityReader;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Resident frames of one asset
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub asset: Arc<Asset>,
    loaded_frames: BTreeMap<u32, FrameHandle>,
    resident_bytes: u64,
    last_accessed_at: Instant,
    access_seq: u64,
    pub pinned: bool,
}

impl CacheEntry {
    fn new(asset: Arc<Asset>, seq: u64) -> Self {
        let pinned = asset.pinned;
        Self {
            asset,
            loaded_frames: BTreeMap::new(),
            resident_bytes: 0,
            last_accessed_at: Instant::now(),
            access_seq: seq,
            pinned,
        }
    }

    fn touch(&mut self, seq: u64) {
        self.last_accessed_at = Instant::now();
        self.access_seq = seq;
    }

    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    pub fn last_accessed_at(&self) -> Instant {
        self.last_accessed_at
    }

    pub fn resident_indices(&self) -> Vec<u32> {
        self.loaded_frames.keys().copied().collect()
    }

    pub fn load_state(&self) -> LoadState {
        match self.loaded_frames.len() {
            0 => LoadState::Empty,
            n if n as u32 >= self.asset.frame_count => LoadState::Complete,
            _ => LoadState::Partial,
        }
    }
}

/// Byte budget; `current_bytes` is the single source of truth for eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    pub max_bytes: u64,
    pub current_bytes: u64,
}

impl MemoryBudget {
    pub fn headroom(&self) -> u64 {
        self.max_bytes.saturating_sub(self.current_bytes)
    }

    pub fn is_exceeded(&self) -> bool {
        self.current_bytes > self.max_bytes
    }
}

/// In-flight fetch of one frame, shared by every caller waiting on it
#[derive(Debug)]
struct LoadingJob {
    key: FrameKey,
    priority: PriorityTier,
    started_at: Mutex<Option<Instant>>,
    result: OnceCell<AnimationResult<FrameHandle>>,
}

impl LoadingJob {
    fn new(key: FrameKey, priority: PriorityTier) -> Self {
        Self {
            key,
            priority,
            started_at: Mutex::new(None),
            result: OnceCell::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Marks a job as running for as long as its fetch future is alive. A job
/// abandoned with no other waiter is retired from the job table on drop.
struct JobGuard<'a> {
    cache: &'a AssetCache,
    job: &'a Arc<LoadingJob>,
    completed: bool,
}

impl<'a> JobGuard<'a> {
    fn start(cache: &'a AssetCache, job: &'a Arc<LoadingJob>) -> Self {
        *job.started_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        Self {
            cache,
            job,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        let started = self
            .job
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if self.completed {
            return;
        }

        // The table and the abandoned caller hold one reference each; any
        // more belong to waiters that will take the job over.
        let mut state = self.cache.write_state();
        let retired = match state.jobs.get(&self.job.key) {
            Some(current) if Arc::ptr_eq(current, self.job) && Arc::strong_count(self.job) <= 2 => {
                state.jobs.remove(&self.job.key);
                true
            }
            _ => false,
        };
        debug!(
            "Fetch of {} abandoned after {:?}{}",
            self.job.key,
            started.map(|s| s.elapsed()),
            if retired { "" } else { ", left to waiting callers" }
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    frames_evicted: u64,
    fetch_failures: u64,
    hard_pressure_events: u64,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<AssetId, CacheEntry>,
    budget: MemoryBudget,
    jobs: HashMap<FrameKey, Arc<LoadingJob>>,
    counters: Counters,
    access_clock: u64,
    hard_pressure: bool,
}

impl CacheState {
    fn next_seq(&mut self) -> u64 {
        self.access_clock += 1;
        self.access_clock
    }
}

/// Cache statistics for diagnostics overlays
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub entry_count: usize,
    pub resident_bytes: u64,
    pub budget_bytes: u64,
    pub in_flight_loads: usize,
    /// Entries in the job table, running or about to be taken over
    pub pending_jobs: usize,
    pub hits: u64,
    pub misses: u64,
    pub frames_evicted: u64,
    pub fetch_failures: u64,
    pub hard_pressure_events: u64,
    /// Pinned frames alone exceed the budget; every unpinned insert is evicted again
    pub hard_pressure: bool,
}

impl CacheStats {
    /// Frame hit ratio as percentage
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Outcome of a preload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadReport {
    pub asset_id: AssetId,
    pub planned: u32,
    pub resident: u32,
    pub failed: u32,
}

/// Read-only view of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub resident_frames: Vec<u32>,
    pub resident_bytes: u64,
    pub load_state: LoadState,
    pub pinned: bool,
}

pub struct AssetCache {
    catalog: Arc<AssetCatalog>,
    loader: FrameLoader,
    settings: QualityReader,
    config: CacheConfig,
    state: RwLock<CacheState>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl AssetCache {
    pub fn new(
        catalog: Arc<AssetCatalog>,
        source: Arc<dyn FrameSource>,
        settings: QualityReader,
        config: CacheConfig,
        loader_config: LoaderConfig,
    ) -> Arc<Self> {
        info!(
            "Initializing frame cache with {} byte budget ({:?})",
            config.budget_bytes, config.eviction.order
        );
        let gate = AdmissionGate::new(settings.clone());
        let state = CacheState {
            entries: HashMap::new(),
            budget: MemoryBudget {
                max_bytes: config.budget_bytes,
                current_bytes: 0,
            },
            jobs: HashMap::new(),
            counters: Counters::default(),
            access_clock: 0,
            hard_pressure: false,
        };
        Arc::new(Self {
            catalog,
            loader: FrameLoader::new(source, gate, loader_config),
            settings,
            config,
            state: RwLock::new(state),
        })
    }

    pub fn catalog(&self) -> &Arc<AssetCatalog> {
        &self.catalog
    }

    pub fn gate(&self) -> &AdmissionGate {
        self.loader.gate()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, asset_id: &AssetId) -> AnimationResult<Arc<Asset>> {
        self.catalog
            .get(asset_id)
            .ok_or_else(|| AnimationError::AssetNotFound {
                asset_id: asset_id.to_string(),
            })
    }

    /// Full ordered frame sequence of an asset. Failed frames are replaced by
    /// the previous good frame so playback degrades instead of aborting.
    pub async fn load_frames(self: &Arc<Self>, asset_id: &AssetId) -> AnimationResult<Vec<FrameHandle>> {
        self.load_sequence(asset_id, None).await
    }

    /// Like `load_frames`, with a caller-supplied frame for slots that have no
    /// previous good frame
    pub async fn load_frames_with_placeholder(
        self: &Arc<Self>,
        asset_id: &AssetId,
        placeholder: FrameHandle,
    ) -> AnimationResult<Vec<FrameHandle>> {
        self.load_sequence(asset_id, Some(placeholder)).await
    }

    async fn load_sequence(
        self: &Arc<Self>,
        asset_id: &AssetId,
        placeholder: Option<FrameHandle>,
    ) -> AnimationResult<Vec<FrameHandle>> {
        let asset = self.lookup(asset_id)?;
        let indices: Vec<u32> = (0..asset.frame_count).collect();
        let slots = self.materialize(&asset, &indices, asset.priority).await;

        let failed = slots.iter().filter(|slot| slot.is_none()).count();
        if failed > 0 {
            warn!(
                "Asset {} degraded: {}/{} frames substituted",
                asset.id, failed, asset.frame_count
            );
        }
        Ok(fill_missing(&asset, slots, placeholder))
    }

    /// A single frame; a failed fetch falls back to the nearest resident frame
    pub async fn load_frame(self: &Arc<Self>, asset_id: &AssetId, index: u32) -> AnimationResult<FrameHandle> {
        let asset = self.lookup(asset_id)?;
        if !asset.contains_frame(index) {
            return Err(AnimationError::InvalidFrameIndex {
                asset_id: asset_id.to_string(),
                index,
                frame_count: asset.frame_count,
            });
        }

        let mut slots = self.materialize(&asset, &[index], asset.priority).await;
        if let Some(frame) = slots.pop().flatten() {
            return Ok(frame);
        }

        let state = self.read_state();
        let fallback = state.entries.get(&asset.id).and_then(|entry| {
            entry
                .loaded_frames
                .range(..index)
                .next_back()
                .or_else(|| entry.loaded_frames.iter().next())
                .map(|(_, frame)| frame.clone())
        });
        Ok(fallback.unwrap_or_else(|| FrameHandle::placeholder(asset.id.clone(), index)))
    }

    /// Warm up the planned subset of an asset's frames. Returns once every
    /// planned frame is resident or has been attempted; failures are logged.
    pub async fn preload(
        self: &Arc<Self>,
        asset_id: &AssetId,
        priority: PriorityTier,
    ) -> AnimationResult<PreloadReport> {
        let asset = self.lookup(asset_id)?;
        let headroom = {
            let state = self.read_state();
            let already_resident = state
                .entries
                .get(&asset.id)
                .map(|entry| entry.resident_bytes)
                .unwrap_or(0);
            state.budget.headroom() + already_resident
        };

        let settings = self.settings.snapshot();
        let planned = PreloadPlanner::frames_to_load_at(&asset, priority, headroom, &settings);
        let indices: Vec<u32> = (0..planned).collect();
        let slots = self.materialize(&asset, &indices, priority).await;

        let resident = slots.iter().filter(|slot| slot.is_some()).count() as u32;
        let report = PreloadReport {
            asset_id: asset.id.clone(),
            planned,
            resident,
            failed: planned - resident,
        };
        if report.failed > 0 {
            warn!(
                "Preload of {} incomplete: {}/{} frames failed",
                asset.id, report.failed, planned
            );
        } else {
            debug!("Preloaded {}: {} frames ({:?})", asset.id, planned, priority);
        }
        Ok(report)
    }

    /// Load every frame of each pinned asset
    pub async fn warm_up_pinned(self: &Arc<Self>) -> Vec<PreloadReport> {
        let pinned = self.catalog.pinned();
        let mut reports = Vec::with_capacity(pinned.len());
        for asset in pinned {
            let indices: Vec<u32> = (0..asset.frame_count).collect();
            let slots = self.materialize(&asset, &indices, PriorityTier::High).await;
            let resident = slots.iter().filter(|slot| slot.is_some()).count() as u32;
            reports.push(PreloadReport {
                asset_id: asset.id.clone(),
                planned: asset.frame_count,
                resident,
                failed: asset.frame_count - resident,
            });
        }
        info!("Warmed up {} pinned assets", reports.len());
        reports
    }

    /// Resolve `indices` of `asset`, fetching what is missing. The result is
    /// aligned with `indices`; `None` marks a frame that could not be loaded.
    async fn materialize(
        self: &Arc<Self>,
        asset: &Arc<Asset>,
        indices: &[u32],
        priority: PriorityTier,
    ) -> Vec<Option<FrameHandle>> {
        let mut slots: Vec<Option<FrameHandle>> = vec![None; indices.len()];
        let mut missing = Vec::new();
        {
            let mut guard = self.write_state();
            let state = &mut *guard;
            let seq = state.next_seq();
            let entry = state
                .entries
                .entry(asset.id.clone())
                .or_insert_with(|| CacheEntry::new(Arc::clone(asset), seq));
            entry.touch(seq);

            for (slot, index) in indices.iter().enumerate() {
                match entry.loaded_frames.get(index) {
                    Some(frame) => slots[slot] = Some(frame.clone()),
                    None => missing.push(slot),
                }
            }
            state.counters.hits += (indices.len() - missing.len()) as u64;
            state.counters.misses += missing.len() as u64;
        }

        if !missing.is_empty() {
            // Dropping the set aborts the fetch tasks, releasing their permits.
            let mut tasks = JoinSet::new();
            for slot in missing {
                let cache = Arc::clone(self);
                let asset = Arc::clone(asset);
                let index = indices[slot];
                tasks.spawn(async move { (slot, cache.fetch_frame(&asset, index, priority).await) });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((slot, Ok(frame))) => slots[slot] = Some(frame),
                    Ok((slot, Err(err))) => {
                        debug!("Frame {}#{} unavailable: {}", asset.id, indices[slot], err);
                    }
                    Err(err) => warn!("Frame fetch task for {} failed: {}", asset.id, err),
                }
            }
        }

        self.prune_if_empty(&asset.id);
        slots
    }

    /// Fetch one frame, joining an in-flight job for the same key if present
    async fn fetch_frame(
        self: &Arc<Self>,
        asset: &Arc<Asset>,
        index: u32,
        priority: PriorityTier,
    ) -> AnimationResult<FrameHandle> {
        let key = FrameKey::new(asset.id.clone(), index);
        let job = {
            let mut state = self.write_state();
            if let Some(frame) = state
                .entries
                .get(&asset.id)
                .and_then(|entry| entry.loaded_frames.get(&index))
            {
                return Ok(frame.clone());
            }
            Arc::clone(
                state
                    .jobs
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(LoadingJob::new(key, priority))),
            )
        };

        job.result
            .get_or_init(|| self.run_job(asset, &job))
            .await
            .clone()
    }

    async fn run_job(&self, asset: &Arc<Asset>, job: &Arc<LoadingJob>) -> AnimationResult<FrameHandle> {
        let guard = JobGuard::start(self, job);
        debug!("Fetching {} ({:?})", job.key, job.priority);
        let result = self.loader.load_frame(asset, job.key.index).await;

        {
            let mut lock = self.write_state();
            let state = &mut *lock;
            match &result {
                Ok(frame) => self.insert_frame(state, asset, frame.clone()),
                Err(_) => state.counters.fetch_failures += 1,
            }
            if state
                .jobs
                .get(&job.key)
                .is_some_and(|current| Arc::ptr_eq(current, job))
            {
                state.jobs.remove(&job.key);
            }
        }

        guard.complete();
        result
    }

    fn insert_frame(&self, state: &mut CacheState, asset: &Arc<Asset>, frame: FrameHandle) {
        let seq = state.next_seq();
        let entry = state
            .entries
            .entry(asset.id.clone())
            .or_insert_with(|| CacheEntry::new(Arc::clone(asset), seq));
        if entry.loaded_frames.contains_key(&frame.index) {
            return;
        }

        let size = frame.size_bytes();
        entry.touch(seq);
        entry.loaded_frames.insert(frame.index, frame);
        entry.resident_bytes += size;
        state.budget.current_bytes += size;

        self.enforce_budget(state);
    }

    /// Evict unpinned frames until resident bytes fall to the policy floor.
    /// No-op while within budget. Returns the number of bytes freed.
    pub fn evict_if_over_budget(&self) -> u64 {
        let mut guard = self.write_state();
        self.enforce_budget(&mut guard)
    }

    fn enforce_budget(&self, state: &mut CacheState) -> u64 {
        if !state.budget.is_exceeded() {
            state.hard_pressure = false;
            return 0;
        }

        let policy: &EvictionPolicy = &self.config.eviction;
        let floor = policy.target_floor(state.budget.max_bytes);
        let start_bytes = state.budget.current_bytes;

        'passes: loop {
            let mut candidates: Vec<EvictionCandidate<AssetId>> = state
                .entries
                .iter()
                .filter(|(_, entry)| !entry.pinned && !entry.loaded_frames.is_empty())
                .map(|(id, entry)| EvictionCandidate {
                    key: id.clone(),
                    last_accessed_at: entry.last_accessed_at,
                    access_seq: entry.access_seq,
                    resident_bytes: entry.resident_bytes,
                })
                .collect();
            if candidates.is_empty() {
                break;
            }
            policy.order_candidates(&mut candidates);

            for candidate in candidates {
                if state.budget.current_bytes <= floor {
                    break 'passes;
                }
                let Some(entry) = state.entries.get_mut(&candidate.key) else {
                    continue;
                };
                let indices = entry.resident_indices();
                for index in policy.select_frames(&indices) {
                    if state.budget.current_bytes <= floor {
                        break;
                    }
                    if let Some(frame) = entry.loaded_frames.remove(&index) {
                        let size = frame.size_bytes();
                        entry.resident_bytes -= size;
                        state.budget.current_bytes -= size;
                        state.counters.frames_evicted += 1;
                    }
                }
                debug!(
                    "Evicted {} down to {} frames",
                    candidate.key,
                    entry.loaded_frames.len()
                );
                if entry.loaded_frames.is_empty() {
                    state.entries.remove(&candidate.key);
                }
            }
        }

        let freed = start_bytes - state.budget.current_bytes;
        if state.budget.is_exceeded() {
            if !state.hard_pressure {
                state.counters.hard_pressure_events += 1;
                let err = AnimationError::BudgetExceededAfterFullEviction {
                    current_bytes: state.budget.current_bytes,
                    max_bytes: state.budget.max_bytes,
                };
                warn!("{}; pinned assets retained", err);
            }
            state.hard_pressure = true;
        } else {
            state.hard_pressure = false;
        }

        if freed > 0 {
            info!(
                "Freed {} bytes through eviction ({} resident, floor {})",
                freed, state.budget.current_bytes, floor
            );
        }
        freed
    }

    /// Mark an asset as recently used without loading anything
    pub fn touch(&self, asset_id: &AssetId) -> bool {
        let mut guard = self.write_state();
        let state = &mut *guard;
        let seq = state.next_seq();
        match state.entries.get_mut(asset_id) {
            Some(entry) => {
                entry.touch(seq);
                true
            }
            None => false,
        }
    }

    /// Change the byte budget and evict to satisfy it
    pub fn set_budget(&self, max_bytes: u64) -> u64 {
        let mut guard = self.write_state();
        info!("Frame cache budget set to {} bytes", max_bytes);
        guard.budget.max_bytes = max_bytes;
        self.enforce_budget(&mut guard)
    }

    /// Drop every unpinned entry. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut guard = self.write_state();
        let state = &mut *guard;
        let before = state.entries.len();
        let mut freed = 0;
        state.entries.retain(|_, entry| {
            if entry.pinned {
                true
            } else {
                freed += entry.resident_bytes;
                false
            }
        });
        state.budget.current_bytes -= freed;
        let removed = before - state.entries.len();
        info!("Cleared {} entries ({} bytes) from frame cache", removed, freed);
        removed
    }

    /// Drop unpinned entries idle longer than the configured TTL, then enforce the budget
    pub fn maintenance(&self) -> usize {
        let idle_ttl = self.config.idle_ttl();
        let mut guard = self.write_state();
        let state = &mut *guard;

        let mut freed = 0;
        let before = state.entries.len();
        state.entries.retain(|id, entry| {
            let expired = !entry.pinned
                && (entry.loaded_frames.is_empty() || entry.last_accessed_at.elapsed() > idle_ttl);
            if expired {
                debug!("Expiring idle asset {}", id);
                freed += entry.resident_bytes;
            }
            !expired
        });
        state.budget.current_bytes -= freed;
        let expired = before - state.entries.len();

        self.enforce_budget(state);
        if expired > 0 {
            info!("Removed {} idle assets during maintenance", expired);
        }
        expired
    }

    fn prune_if_empty(&self, asset_id: &AssetId) {
        let mut state = self.write_state();
        if state
            .entries
            .get(asset_id)
            .is_some_and(|entry| entry.loaded_frames.is_empty() && !entry.pinned)
        {
            state.entries.remove(asset_id);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.read_state();
        CacheStats {
            entry_count: state.entries.len(),
            resident_bytes: state.budget.current_bytes,
            budget_bytes: state.budget.max_bytes,
            in_flight_loads: state.jobs.values().filter(|job| job.is_running()).count(),
            pending_jobs: state.jobs.len(),
            hits: state.counters.hits,
            misses: state.counters.misses,
            frames_evicted: state.counters.frames_evicted,
            fetch_failures: state.counters.fetch_failures,
            hard_pressure_events: state.counters.hard_pressure_events,
            hard_pressure: state.hard_pressure,
        }
    }

    pub fn budget(&self) -> MemoryBudget {
        self.read_state().budget
    }

    pub fn entry(&self, asset_id: &AssetId) -> Option<EntrySnapshot> {
        let state = self.read_state();
        state.entries.get(asset_id).map(|entry| EntrySnapshot {
            resident_frames: entry.resident_indices(),
            resident_bytes: entry.resident_bytes,
            load_state: entry.load_state(),
            pinned: entry.pinned,
        })
    }

    /// `current_bytes` equals the sum of entry sizes, which equal the sum of their frames
    pub fn accounting_is_consistent(&self) -> bool {
        let state = self.read_state();
        let mut total = 0;
        for entry in state.entries.values() {
            let frames: u64 = entry.loaded_frames.values().map(FrameHandle::size_bytes).sum();
            if frames != entry.resident_bytes {
                return false;
            }
            total += entry.resident_bytes;
        }
        total == state.budget.current_bytes
    }
}

/// Fill unloaded slots: previous good frame, then the placeholder, then the
/// first good frame of the sequence, then an empty placeholder frame.
fn fill_missing(
    asset: &Asset,
    slots: Vec<Option<FrameHandle>>,
    placeholder: Option<FrameHandle>,
) -> Vec<FrameHandle> {
    let first_good = slots.iter().flatten().next().cloned();
    let mut previous: Option<FrameHandle> = None;

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| match slot {
            Some(frame) => {
                previous = Some(frame.clone());
                frame
            }
            None => previous
                .clone()
                .or_else(|| placeholder.clone())
                .or_else(|| first_good.clone())
                .unwrap_or_else(|| FrameHandle::placeholder(asset.id.clone(), position as u32)),
        })
        .collect()
}
