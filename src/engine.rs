//! Application-facing facade
//!
//! `AnimationEngine` wires the catalog, cache, controller, profilers and state
//! store together. It is constructed explicitly through `AnimationEngineBuilder`
//! and handed to consumers; there is no global instance.

use crate::assets::{
    Asset, AssetCache, AssetCatalog, AssetId, CacheStats, FrameHandle, FrameSource, PreloadReport,
    PriorityTier,
};
use crate::config::{default_state_dir, EngineConfig};
use crate::error::{AnimationError, AnimationResult};
use crate::persistence::{load_quality_record, save_quality_record, FileStateStore, QualityRecord, StateStore};
use crate::profiling::{
    CapabilityScorer, DeviceProfile, DeviceProfiler, HttpLatencyProbe, LatencyProbe, LinkKind, NetworkClass,
    NetworkProfile, NetworkProfiler, PlatformProbe, Stability, SysinfoProbe, TableScorer,
};
use crate::quality::{PerformanceSample, QualityController, QualityReader, QualitySettings, QualityTier, TierChange};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub struct AnimationEngineBuilder {
    config: EngineConfig,
    source: Option<Arc<dyn FrameSource>>,
    platform_probe: Option<Box<dyn PlatformProbe>>,
    scorer: Option<Box<dyn CapabilityScorer>>,
    latency_probe: Option<Arc<dyn LatencyProbe>>,
    store: Option<Arc<dyn StateStore>>,
}

impl AnimationEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            source: None,
            platform_probe: None,
            scorer: None,
            latency_probe: None,
            store: None,
        }
    }

    /// Platform primitive fetching one frame's bytes (required)
    pub fn frame_source(mut self, source: Arc<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn platform_probe(mut self, probe: Box<dyn PlatformProbe>) -> Self {
        self.platform_probe = Some(probe);
        self
    }

    pub fn capability_scorer(mut self, scorer: Box<dyn CapabilityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn latency_probe(mut self, probe: Arc<dyn LatencyProbe>) -> Self {
        self.latency_probe = Some(probe);
        self
    }

    /// Overrides the file store derived from `PersistenceConfig`
    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> AnimationResult<AnimationEngine> {
        let config = self.config;
        config.validate()?;
        let source = self.source.ok_or_else(|| AnimationError::Config {
            reason: "a frame source is required".to_string(),
        })?;

        let device_profiler = Arc::new(DeviceProfiler::new(
            self.platform_probe.unwrap_or_else(|| Box::new(SysinfoProbe)),
            self.scorer.unwrap_or_else(|| Box::new(TableScorer::default())),
            config.profiler.device_cache_ttl(),
        ));

        let store = match self.store {
            Some(store) => Some(store),
            None if config.persistence.enabled => config
                .persistence
                .state_dir
                .clone()
                .or_else(default_state_dir)
                .map(|dir| Arc::new(FileStateStore::new(dir)) as Arc<dyn StateStore>),
            None => None,
        };

        let restored = store.as_deref().and_then(|store| match load_quality_record(store) {
            Ok(record) => record.filter(|r| r.is_fresh(config.profiler.device_cache_ttl())),
            Err(e) => {
                warn!("Ignoring persisted quality state: {}", e);
                None
            }
        });

        let (controller, compute_score) = match restored {
            Some(record) => {
                info!(
                    "Restored quality tier {:?} (score {:.2}, {:?} old)",
                    record.tier,
                    record.compute_score,
                    record.age()
                );
                let controller = QualityController::new(config.controller.clone(), record.tier);
                if let Some(device) = device_profiler.live_profile(record.compute_score) {
                    controller.update_device(device);
                }
                (controller, record.compute_score)
            }
            None => {
                let device = device_profiler.assess();
                (
                    QualityController::for_device(config.controller.clone(), device),
                    device.compute_score,
                )
            }
        };
        let controller = Arc::new(controller);

        let catalog = Arc::new(AssetCatalog::new());
        let cache = AssetCache::new(
            Arc::clone(&catalog),
            source,
            controller.reader(),
            config.cache.clone(),
            config.loader.clone(),
        );

        let latency_probe = match self.latency_probe {
            Some(probe) => Some(probe),
            None => config.profiler.probe_url.as_ref().and_then(|url| {
                match HttpLatencyProbe::new(url.clone(), config.profiler.probe_timeout()) {
                    Ok(probe) => Some(Arc::new(probe) as Arc<dyn LatencyProbe>),
                    Err(e) => {
                        warn!("Network probing disabled: {}", e);
                        None
                    }
                }
            }),
        };
        let network_profiler = latency_probe
            .map(|probe| Arc::new(NetworkProfiler::new(probe, config.profiler.probe_plan())));

        let engine = AnimationEngine {
            config,
            catalog,
            cache,
            controller,
            device_profiler,
            network_profiler,
            persister: StatePersister { store, compute_score },
        };
        engine.persister.save(engine.controller.tier());
        Ok(engine)
    }
}

/// Writes the quality record; failures are logged, never raised
#[derive(Clone)]
struct StatePersister {
    store: Option<Arc<dyn StateStore>>,
    compute_score: f32,
}

impl StatePersister {
    fn save(&self, tier: QualityTier) {
        if let Err(e) = self.try_save(tier) {
            error!("Failed to persist quality state: {}", e);
        }
    }

    fn try_save(&self, tier: QualityTier) -> AnimationResult<()> {
        match &self.store {
            Some(store) => save_quality_record(store.as_ref(), &QualityRecord::now(tier, self.compute_score)),
            None => Ok(()),
        }
    }
}

pub struct AnimationEngine {
    config: EngineConfig,
    catalog: Arc<AssetCatalog>,
    cache: Arc<AssetCache>,
    controller: Arc<QualityController>,
    device_profiler: Arc<DeviceProfiler>,
    network_profiler: Option<Arc<NetworkProfiler>>,
    persister: StatePersister,
}

impl std::fmt::Debug for AnimationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationEngine")
            .field("cache", &self.cache)
            .field("quality", &self.controller.settings())
            .finish_non_exhaustive()
    }
}

impl AnimationEngine {
    pub fn builder(config: EngineConfig) -> AnimationEngineBuilder {
        AnimationEngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<AssetCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    pub fn controller(&self) -> &Arc<QualityController> {
        &self.controller
    }

    pub fn register_asset(&self, asset: Asset) {
        self.catalog.register(asset);
    }

    pub fn register_assets(&self, assets: impl IntoIterator<Item = Asset>) {
        self.catalog.register_all(assets);
    }

    pub fn unregister_asset(&self, asset_id: &AssetId) -> bool {
        self.catalog.unregister(asset_id).is_some()
    }

    pub fn report_performance_sample(&self, sample: PerformanceSample) {
        self.controller.report_sample(sample);
    }

    /// Re-assess the network after a connectivity change and apply any override
    pub async fn report_network_change(&self, link: LinkKind) -> NetworkProfile {
        let profile = match &self.network_profiler {
            Some(profiler) => profiler.assess(link).await,
            None => unprobed_profile(link),
        };
        self.controller.update_network(profile);
        profile
    }

    /// Probe the device again, bypassing the cached profile
    pub fn refresh_device_profile(&self) -> DeviceProfile {
        self.device_profiler.invalidate();
        let device = self.device_profiler.assess();
        self.controller.update_device(device);
        device
    }

    pub async fn request_frames(&self, asset_id: &AssetId) -> AnimationResult<Vec<FrameHandle>> {
        self.cache.load_frames(asset_id).await
    }

    pub async fn request_frame(&self, asset_id: &AssetId, index: u32) -> AnimationResult<FrameHandle> {
        self.cache.load_frame(asset_id, index).await
    }

    /// Fire-and-forget warm up. Must be called from within a tokio runtime.
    pub fn preload_asset(&self, asset_id: &AssetId, priority: PriorityTier) -> JoinHandle<AnimationResult<PreloadReport>> {
        let cache = Arc::clone(&self.cache);
        let asset_id = asset_id.clone();
        tokio::spawn(async move { cache.preload(&asset_id, priority).await })
    }

    pub fn touch_asset(&self, asset_id: &AssetId) -> bool {
        self.cache.touch(asset_id)
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn set_memory_budget(&self, max_bytes: u64) -> u64 {
        self.cache.set_budget(max_bytes)
    }

    pub fn quality_settings(&self) -> QualitySettings {
        self.controller.settings()
    }

    pub fn subscribe_quality(&self) -> QualityReader {
        self.controller.reader()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Run one controller step now, persisting the tier if it changed
    pub fn evaluate_quality(&self, now: Instant) -> Option<TierChange> {
        let change = self.controller.evaluate(now);
        if let Some(change) = change {
            self.persister.save(change.to);
        }
        change
    }

    pub fn persist_state(&self) -> AnimationResult<()> {
        self.persister.try_save(self.controller.tier())
    }

    /// Warm up the pinned set, then start the background control loop
    pub async fn start(&self) -> MaintenanceHandle {
        let reports = self.cache.warm_up_pinned().await;
        let failed: u32 = reports.iter().map(|r| r.failed).sum();
        if failed > 0 {
            warn!("{} pinned frames failed to load at startup", failed);
        }
        self.spawn_background()
    }

    /// Start the periodic controller and cache maintenance task
    pub fn spawn_background(&self) -> MaintenanceHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cache = Arc::clone(&self.cache);
        let controller = Arc::clone(&self.controller);
        let persister = self.persister.clone();
        let tick = self.config.controller.evaluation_interval();
        let maintenance_every = maintenance_interval(self.config.cache.idle_ttl());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut maintenance = tokio::time::interval(maintenance_every);
            maintenance.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Background maintenance started (tick {:?}, sweep {:?})", tick, maintenance_every);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Some(change) = controller.evaluate(Instant::now()) {
                            persister.save(change.to);
                        }
                        cache.evict_if_over_budget();
                    }
                    _ = maintenance.tick() => {
                        let expired = cache.maintenance();
                        debug!("Maintenance sweep expired {} assets", expired);
                    }
                }
            }

            persister.save(controller.tier());
            info!("Background maintenance stopped");
        });

        MaintenanceHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Profile used when no latency probe is configured
fn unprobed_profile(link: LinkKind) -> NetworkProfile {
    let class = match link {
        LinkKind::None => return NetworkProfile::offline(),
        LinkKind::Wifi | LinkKind::Wired => NetworkClass::Wifi,
        LinkKind::Cellular => NetworkClass::CellularSlow,
    };
    NetworkProfile {
        class,
        latency_ms: 0.0,
        stability: Stability::Stable,
    }
}

fn maintenance_interval(idle_ttl: Duration) -> Duration {
    (idle_ttl / 10).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

/// Cancellation handle for the background task. Dropping it also stops the task.
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop and wait for its final state write
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Background maintenance task ended abnormally: {}", e);
        }
    }
}
