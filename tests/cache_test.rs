use async_trait::async_trait;
use bytes::Bytes;
use frameflow::assets::{Asset, AssetCache, AssetCatalog, AssetCategory, AssetId, FrameHandle, FrameSource, PriorityTier};
use frameflow::config::{CacheConfig, LoaderConfig};
use frameflow::quality::{quality_channel, QualityPublisher, QualitySettings, QualityTier};
use frameflow::{AnimationError, AnimationResult};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Frame source instrumented with fetch counters, a concurrency high-water
/// mark, per-frame failure injection and artificial latency
#[derive(Default)]
struct InstrumentedSource {
    delay: Duration,
    slow_frames: HashSet<u32>,
    failing: Mutex<HashSet<(String, u32)>>,
    fetches: AtomicUsize,
    per_frame: Mutex<HashMap<(String, u32), usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InstrumentedSource {
    fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Default::default() }
    }

    fn fail(&self, asset: &str, index: u32) {
        self.failing.lock().unwrap().insert((asset.to_string(), index));
    }

    fn fetches_of(&self, asset: &str, index: u32) -> usize {
        self.per_frame.lock().unwrap().get(&(asset.to_string(), index)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl FrameSource for InstrumentedSource {
    async fn fetch(&self, asset: &Asset, index: u32) -> AnimationResult<Bytes> {
        let key = (asset.id.to_string(), index);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.per_frame.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = if self.slow_frames.contains(&index) { Duration::from_secs(3600) } else { self.delay };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&key) {
            return Err(AnimationError::FrameFetchFailed {
                asset_id: key.0,
                index,
                reason: "injected".to_string(),
            });
        }
        Ok(Bytes::from(vec![index as u8; asset.estimated_bytes_per_frame as usize]))
    }
}

fn cache_with(source: Arc<InstrumentedSource>, budget: u64, tier: QualityTier) -> (Arc<AssetCache>, QualityPublisher) {
    let (publisher, reader) = quality_channel(QualitySettings::for_tier(tier));
    let config = CacheConfig {
        budget_bytes: budget,
        ..CacheConfig::default()
    };
    let loader = LoaderConfig {
        fetch_timeout_ms: 10_000,
        max_retries: 0,
        retry_backoff_ms: 1,
        retry_jitter_ms: 0,
    };
    let cache = AssetCache::new(Arc::new(AssetCatalog::new()), source, reader, config, loader);
    (cache, publisher)
}

fn asset(id: &str, frames: u32, bytes: u64, priority: PriorityTier) -> Asset {
    Asset::new(id, "test", AssetCategory::Effect, frames, bytes, priority)
}

fn id(value: &str) -> AssetId {
    AssetId::from(value)
}

#[tokio::test]
async fn test_preload_scenario_within_budget() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source, 10_000_000, QualityTier::Medium);
    cache.catalog().register(asset("a", 20, 100_000, PriorityTier::High));
    cache.catalog().register(asset("b", 20, 100_000, PriorityTier::Low));

    let b = cache.preload(&id("b"), PriorityTier::Low).await.unwrap();
    let a = cache.preload(&id("a"), PriorityTier::High).await.unwrap();

    assert_eq!((a.planned, a.resident, a.failed), (15, 15, 0));
    assert_eq!((b.planned, b.resident, b.failed), (3, 3, 0));

    let stats = cache.stats();
    assert_eq!(stats.resident_bytes, 1_800_000);
    assert_eq!(stats.entry_count, 2);
    assert_eq!(stats.frames_evicted, 0);
    assert!(cache.accounting_is_consistent());
}

#[tokio::test]
async fn test_budget_drop_evicts_oldest_first_to_floor() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source, 10_000_000, QualityTier::Medium);
    cache.catalog().register(asset("a", 20, 100_000, PriorityTier::High));
    cache.catalog().register(asset("b", 20, 100_000, PriorityTier::Low));
    cache.preload(&id("b"), PriorityTier::Low).await.unwrap();
    cache.preload(&id("a"), PriorityTier::High).await.unwrap();

    let freed = cache.set_budget(1_000_000);
    assert_eq!(freed, 1_100_000);
    assert_eq!(cache.evict_if_over_budget(), 0);

    let stats = cache.stats();
    assert_eq!(stats.resident_bytes, 700_000);
    assert!(stats.resident_bytes <= stats.budget_bytes);
    assert!(!stats.hard_pressure);

    // B lost two of three frames on the first pass, then its last one
    assert!(cache.entry(&id("b")).is_none());
    let a = cache.entry(&id("a")).unwrap();
    assert_eq!(a.resident_frames, vec![0, 2, 4, 6, 8, 10, 12]);
    assert!(cache.accounting_is_consistent());
}

#[tokio::test]
async fn test_pinned_assets_survive_full_eviction() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::High);
    cache.catalog().register(asset("pinned", 10, 100_000, PriorityTier::High).pinned());
    cache.catalog().register(asset("loose", 10, 100_000, PriorityTier::Low));

    let reports = cache.warm_up_pinned().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].resident, 10);
    cache.load_frames(&id("loose")).await.unwrap();

    cache.set_budget(500_000);
    let stats = cache.stats();
    assert!(stats.hard_pressure);
    assert_eq!(stats.hard_pressure_events, 1);
    assert_eq!(stats.resident_bytes, 1_000_000);
    assert_eq!(cache.entry(&id("pinned")).unwrap().resident_frames.len(), 10);
    assert!(cache.entry(&id("loose")).is_none());

    // Degraded mode: each unpinned insert is evicted again, the caller still gets frames
    let frames = cache.load_frames(&id("loose")).await.unwrap();
    assert_eq!(frames.len(), 10);
    assert!(frames.iter().all(|f| !f.is_placeholder));
    assert_eq!(cache.entry(&id("pinned")).unwrap().resident_frames.len(), 10);
    assert_eq!(cache.stats().resident_bytes, 1_000_000);
    assert_eq!(cache.stats().hard_pressure_events, 1);
    assert!(cache.accounting_is_consistent());

    cache.set_budget(5_000_000);
    assert!(!cache.stats().hard_pressure);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let source = Arc::new(InstrumentedSource::with_delay(Duration::from_millis(30)));
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::Ultra);
    cache.catalog().register(asset("wave", 6, 1_000, PriorityTier::Medium));

    let mut callers = Vec::new();
    for n in 0..8 {
        let cache = Arc::clone(&cache);
        callers.push(tokio::spawn(async move {
            if n % 2 == 0 {
                cache.load_frames(&id("wave")).await.map(|frames| frames.len())
            } else {
                cache.load_frame(&id("wave"), 3).await.map(|_| 1)
            }
        }));
    }
    for caller in callers {
        assert!(caller.await.unwrap().is_ok());
    }

    for index in 0..6 {
        assert_eq!(source.fetches_of("wave", index), 1, "frame {} fetched more than once", index);
    }
    assert_eq!(source.fetches.load(Ordering::SeqCst), 6);
    assert_eq!(cache.stats().resident_bytes, 6_000);
    assert_eq!(cache.stats().in_flight_loads, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admission_bound_follows_settings() {
    let source = Arc::new(InstrumentedSource::with_delay(Duration::from_millis(15)));
    let (cache, publisher) = cache_with(source.clone(), 100_000_000, QualityTier::Low);
    for n in 0..6 {
        cache.catalog().register(asset(&format!("fx{}", n), 10, 500, PriorityTier::High));
    }

    let load_all = |range: std::ops::Range<usize>| {
        let mut tasks = Vec::new();
        for n in range {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move { cache.load_frames(&id(&format!("fx{}", n))).await }));
        }
        tasks
    };

    for task in load_all(0..3) {
        assert_eq!(task.await.unwrap().unwrap().len(), 10);
    }
    assert!(source.peak.load(Ordering::SeqCst) <= 2);
    assert!(cache.gate().peak_in_use() <= 2);

    publisher.publish(QualitySettings::for_tier(QualityTier::Ultra));
    for task in load_all(3..6) {
        task.await.unwrap().unwrap();
    }
    assert!(source.peak.load(Ordering::SeqCst) <= 8);
    assert_eq!(cache.gate().in_use(), 0);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 60);
}

#[tokio::test]
async fn test_failed_frames_degrade_to_previous_frame() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::Medium);
    cache.catalog().register(asset("spin", 6, 100, PriorityTier::Medium));
    source.fail("spin", 2);
    source.fail("spin", 3);

    let frames = cache.load_frames(&id("spin")).await.unwrap();
    assert_eq!(frames.len(), 6);
    let indices: Vec<u32> = frames.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 1, 1, 1, 4, 5]);
    assert_eq!(cache.stats().fetch_failures, 2);
    assert_eq!(cache.entry(&id("spin")).unwrap().resident_frames, vec![0, 1, 4, 5]);
}

#[tokio::test]
async fn test_leading_failure_uses_placeholder() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::Medium);
    cache.catalog().register(asset("pop", 3, 100, PriorityTier::Medium));
    source.fail("pop", 0);

    let placeholder = FrameHandle::new(id("pop"), u32::MAX, Bytes::from_static(b"ph"));
    let frames = cache.load_frames_with_placeholder(&id("pop"), placeholder.clone()).await.unwrap();
    assert_eq!(frames[0], placeholder);
    assert_eq!(frames[1].index, 1);

    // Single-frame fallback: nearest resident frame
    let frame = cache.load_frame(&id("pop"), 0).await.unwrap();
    assert_eq!(frame.index, 1);
}

#[tokio::test]
async fn test_nothing_loadable_still_returns_full_sequence() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::Medium);
    cache.catalog().register(asset("gone", 4, 100, PriorityTier::Medium));
    for index in 0..4 {
        source.fail("gone", index);
    }

    let frames = cache.load_frames(&id("gone")).await.unwrap();
    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|f| f.is_placeholder));
    assert_eq!(cache.stats().entry_count, 0);
    assert_eq!(cache.stats().resident_bytes, 0);
}

#[tokio::test]
async fn test_caller_errors_are_hard_failures() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source, 10_000_000, QualityTier::Medium);
    cache.catalog().register(asset("known", 4, 100, PriorityTier::Medium));

    assert!(matches!(
        cache.load_frames(&id("unknown")).await,
        Err(AnimationError::AssetNotFound { .. })
    ));
    assert!(matches!(
        cache.preload(&id("unknown"), PriorityTier::High).await,
        Err(AnimationError::AssetNotFound { .. })
    ));
    assert!(matches!(
        cache.load_frame(&id("known"), 4).await,
        Err(AnimationError::InvalidFrameIndex { index: 4, frame_count: 4, .. })
    ));
}

#[tokio::test]
async fn test_cancelled_load_releases_permits_and_keeps_finished_frames() {
    let source = Arc::new(InstrumentedSource {
        slow_frames: [1, 2, 3].into_iter().collect(),
        ..Default::default()
    });
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::Ultra);
    cache.catalog().register(asset("stuck", 4, 100, PriorityTier::Medium));

    let attempt = tokio::time::timeout(Duration::from_millis(50), cache.load_frames(&id("stuck"))).await;
    assert!(attempt.is_err());
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(cache.gate().in_use(), 0);
    assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(cache.stats().in_flight_loads, 0);
    assert_eq!(cache.stats().pending_jobs, 0);
    assert_eq!(cache.entry(&id("stuck")).unwrap().resident_frames, vec![0]);
    assert_eq!(cache.stats().resident_bytes, 100);
    assert!(cache.accounting_is_consistent());
}

#[tokio::test]
async fn test_waiter_takes_over_cancelled_fetch() {
    let source = Arc::new(InstrumentedSource::with_delay(Duration::from_millis(100)));
    let (cache, _publisher) = cache_with(source.clone(), 10_000_000, QualityTier::Ultra);
    cache.catalog().register(asset("shared", 2, 100, PriorityTier::Medium));

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.load_frames(&id("shared")).await
        })
    };
    let cancelled = tokio::time::timeout(Duration::from_millis(40), cache.load_frames(&id("shared"))).await;
    assert!(cancelled.is_err());

    let frames = waiter.await.unwrap().unwrap();
    assert_eq!(frames.iter().map(|f| f.index).collect::<Vec<_>>(), vec![0, 1]);
    assert!(frames.iter().all(|f| !f.is_placeholder));

    let stats = cache.stats();
    assert_eq!(stats.pending_jobs, 0);
    assert_eq!(stats.resident_bytes, 200);
    assert!(source.fetches_of("shared", 0) <= 2);
    assert!(cache.accounting_is_consistent());
}

#[tokio::test]
async fn test_touch_clear_and_maintenance() {
    let source = Arc::new(InstrumentedSource::default());
    let (publisher, reader) = quality_channel(QualitySettings::for_tier(QualityTier::High));
    let config = CacheConfig {
        budget_bytes: 10_000_000,
        idle_ttl_secs: 0,
        ..CacheConfig::default()
    };
    let cache = AssetCache::new(Arc::new(AssetCatalog::new()), source, reader, config, LoaderConfig::default());
    cache.catalog().register(asset("keep", 4, 100, PriorityTier::High).pinned());
    cache.catalog().register(asset("idle", 4, 100, PriorityTier::High));
    cache.catalog().register(asset("drop", 4, 100, PriorityTier::High));

    cache.warm_up_pinned().await;
    cache.load_frames(&id("idle")).await.unwrap();
    cache.load_frames(&id("drop")).await.unwrap();
    assert!(cache.touch(&id("idle")));
    assert!(!cache.touch(&id("never-loaded")));

    assert_eq!(cache.clear(), 2);
    assert_eq!(cache.stats().entry_count, 1);
    assert_eq!(cache.stats().resident_bytes, 400);

    cache.load_frames(&id("idle")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cache.maintenance(), 1);
    assert!(cache.entry(&id("keep")).is_some());
    assert!(cache.accounting_is_consistent());
    drop(publisher);
}

#[tokio::test]
async fn test_budget_invariant_under_random_operations() {
    let source = Arc::new(InstrumentedSource::default());
    let (cache, _publisher) = cache_with(source, 2_000_000, QualityTier::Ultra);
    let ids: Vec<String> = (0..8).map(|n| format!("asset{}", n)).collect();
    for (n, name) in ids.iter().enumerate() {
        let priority = [PriorityTier::Low, PriorityTier::Medium, PriorityTier::High][n % 3];
        cache.catalog().register(asset(name, 10 + n as u32 * 3, 20_000 + n as u64 * 10_000, priority));
    }

    for _ in 0..200 {
        let (op, target, budget) = {
            let mut rng = rand::rng();
            (rng.random_range(0..4), ids[rng.random_range(0..ids.len())].clone(), rng.random_range(300_000..3_000_000u64))
        };
        match op {
            0 => {
                cache.preload(&id(&target), PriorityTier::High).await.unwrap();
            }
            1 => {
                cache.load_frames(&id(&target)).await.unwrap();
            }
            2 => {
                cache.set_budget(budget);
            }
            _ => {
                cache.evict_if_over_budget();
            }
        }

        let stats = cache.stats();
        assert!(
            stats.resident_bytes <= stats.budget_bytes,
            "{} > {}",
            stats.resident_bytes,
            stats.budget_bytes
        );
        assert!(cache.accounting_is_consistent());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_budget_invariant_under_concurrent_operations() {
    let source = Arc::new(InstrumentedSource::with_delay(Duration::from_millis(1)));
    let (cache, _publisher) = cache_with(source, 2_000_000, QualityTier::Ultra);
    let ids: Vec<String> = (0..8).map(|n| format!("asset{}", n)).collect();
    for (n, name) in ids.iter().enumerate() {
        let priority = [PriorityTier::Low, PriorityTier::Medium, PriorityTier::High][n % 3];
        cache.catalog().register(asset(name, 10 + n as u32 * 3, 20_000 + n as u64 * 10_000, priority));
    }

    for _round in 0..5 {
        let ops: Vec<(u32, String, u64)> = {
            let mut rng = rand::rng();
            (0..48)
                .map(|_| {
                    (
                        rng.random_range(0..4),
                        ids[rng.random_range(0..ids.len())].clone(),
                        rng.random_range(300_000..3_000_000u64),
                    )
                })
                .collect()
        };

        let mut tasks = tokio::task::JoinSet::new();
        for (op, target, budget) in ops {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move {
                match op {
                    0 => {
                        cache.preload(&id(&target), PriorityTier::High).await.unwrap();
                    }
                    1 => {
                        cache.load_frames(&id(&target)).await.unwrap();
                    }
                    2 => {
                        cache.set_budget(budget);
                    }
                    _ => {
                        cache.evict_if_over_budget();
                    }
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        let stats = cache.stats();
        assert!(
            stats.resident_bytes <= stats.budget_bytes,
            "{} > {}",
            stats.resident_bytes,
            stats.budget_bytes
        );
        assert_eq!(stats.pending_jobs, 0);
        assert!(cache.accounting_is_consistent());
    }
}
