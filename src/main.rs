use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use frameflow::assets::{Asset, AssetCategory, AssetId, FrameSource, PriorityTier};
use frameflow::config::{EngineConfig, RuntimeConfig};
use frameflow::profiling::{DeviceProfiler, LinkKind};
use frameflow::quality::PerformanceSample;
use frameflow::utils::logging::{init_logging, log_system_info};
use frameflow::{AnimationEngine, AnimationError, AnimationResult};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Frame source with random latency and injected failures
struct SyntheticFrameSource {
    min_latency_ms: u64,
    max_latency_ms: u64,
    failure_rate: f64,
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn fetch(&self, asset: &Asset, index: u32) -> AnimationResult<Bytes> {
        let (latency, fail) = {
            let mut rng = rand::rng();
            (
                rng.random_range(self.min_latency_ms..=self.max_latency_ms),
                rng.random_bool(self.failure_rate),
            )
        };
        tokio::time::sleep(Duration::from_millis(latency)).await;
        if fail {
            return Err(AnimationError::FrameFetchFailed {
                asset_id: asset.id.to_string(),
                index,
                reason: "synthetic failure".to_string(),
            });
        }
        Ok(Bytes::from(vec![0u8; asset.estimated_bytes_per_frame as usize]))
    }
}

fn demo_catalog() -> Vec<Asset> {
    vec![
        Asset::new("heart", "classic", AssetCategory::Emoji, 12, 40_000, PriorityTier::High).pinned(),
        Asset::new("thumbs_up", "classic", AssetCategory::Emoji, 12, 40_000, PriorityTier::Medium),
        Asset::new("laugh", "classic", AssetCategory::Emoji, 24, 40_000, PriorityTier::Low),
        Asset::new("aurora", "night", AssetCategory::Theme, 60, 180_000, PriorityTier::Medium),
        Asset::new("sunrise", "day", AssetCategory::Theme, 48, 180_000, PriorityTier::Low),
        Asset::new("confetti", "party", AssetCategory::Effect, 30, 120_000, PriorityTier::High),
        Asset::new("fireworks", "party", AssetCategory::Effect, 40, 150_000, PriorityTier::Medium),
        Asset::new("streak_flame", "rewards", AssetCategory::Effect, 20, 90_000, PriorityTier::High).pinned(),
    ]
}

async fn simulate(config: EngineConfig) -> Result<()> {
    let source = Arc::new(SyntheticFrameSource {
        min_latency_ms: 5,
        max_latency_ms: 60,
        failure_rate: 0.03,
    });
    let engine = AnimationEngine::builder(config).frame_source(source).build()?;
    let catalog = demo_catalog();
    let ids: Vec<AssetId> = catalog.iter().map(|a| a.id.clone()).collect();
    engine.register_assets(catalog);

    let maintenance = engine.start().await;
    engine.report_network_change(LinkKind::Wifi).await;

    let started = Instant::now();
    for step in 0..60u32 {
        let (play, warm) = {
            let mut rng = rand::rng();
            (
                ids[rng.random_range(0..ids.len())].clone(),
                ids[rng.random_range(0..ids.len())].clone(),
            )
        };

        let _ = engine.preload_asset(&warm, PriorityTier::Medium);
        let frames = engine.request_frames(&play).await?;
        let substituted = frames.iter().filter(|f| f.is_placeholder).count();

        let stats = engine.cache_stats();
        let settings = engine.quality_settings();
        let memory_ratio = stats.resident_bytes as f32 / stats.budget_bytes.max(1) as f32;
        let fps = {
            let mut rng = rand::rng();
            let load_penalty = stats.in_flight_loads as f32 * 2.0;
            (settings.target_fps + rng.random_range(-8.0f32..8.0) - load_penalty).max(1.0)
        };
        engine.report_performance_sample(PerformanceSample::new(fps, memory_ratio, 0.4));

        if step == 20 {
            info!("Simulating switch to cellular");
            engine.report_network_change(LinkKind::Cellular).await;
        }
        if step == 40 {
            info!("Simulating platform memory warning");
            engine.set_memory_budget(stats.budget_bytes / 4);
        }
        if step % 10 == 0 {
            info!(
                "step {:>2}: played {} ({} frames, {} placeholders) tier {:?} resident {}/{} bytes hit ratio {:.1}%",
                step,
                play,
                frames.len(),
                substituted,
                settings.tier,
                stats.resident_bytes,
                stats.budget_bytes,
                stats.hit_ratio()
            );
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    maintenance.shutdown().await;
    let stats = engine.cache_stats();
    info!(
        "Simulation finished in {:?}: {} entries, {} bytes resident, {} evicted, {} failures, consistent: {}",
        started.elapsed(),
        stats.entry_count,
        stats.resident_bytes,
        stats.frames_evicted,
        stats.fetch_failures,
        engine.cache().accounting_is_consistent()
    );
    Ok(())
}

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref())?;
    init_logging(&config.logging)?;
    log_system_info();

    let device = DeviceProfiler::system(config.profiler.device_cache_ttl()).assess();
    let runtime = RuntimeConfig::for_device(&device).build()?;
    runtime.block_on(simulate(config))
}
