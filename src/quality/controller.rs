//! Closed-loop quality tier control
//!
//! Downgrades are immediate. Upgrades need good averages and a quiet period
//! since the last transition in either direction. The published settings are
//! the tier's defaults with the network and battery overrides applied on top.

use super::samples::{PerformanceSample, SampleWindow, WindowAverages};
use super::settings::{lower_fps_notch, quality_channel, PreloadAggressiveness, QualityPublisher, QualityReader, QualitySettings, QualityTier};
use crate::profiling::{DeviceProfile, NetworkProfile};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub evaluation_interval_ms: u64,
    /// Samples kept in the rolling window
    pub window_size: usize,
    /// Fewest samples a decision is made on
    pub min_samples: usize,
    pub upgrade_cooldown_secs: u64,
    pub downgrade_memory_ratio: f32,
    pub upgrade_memory_ratio: f32,
    pub low_battery_threshold: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_ms: 1000,
            window_size: 10,
            min_samples: 3,
            upgrade_cooldown_secs: 10,
            downgrade_memory_ratio: 0.8,
            upgrade_memory_ratio: 0.5,
            low_battery_threshold: 0.2,
        }
    }
}

impl ControllerConfig {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.evaluation_interval_ms.max(1))
    }

    pub fn upgrade_cooldown(&self) -> Duration {
        Duration::from_secs(self.upgrade_cooldown_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    LowFps,
    MemoryPressure,
    Headroom,
}

/// A tier transition made by `evaluate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierChange {
    pub from: QualityTier,
    pub to: QualityTier,
    pub reason: ChangeReason,
}

impl TierChange {
    pub fn is_upgrade(&self) -> bool {
        self.to > self.from
    }
}

#[derive(Debug)]
struct ControllerState {
    tier: QualityTier,
    window: SampleWindow,
    last_downgrade_at: Option<Instant>,
    last_upgrade_at: Option<Instant>,
    device: Option<DeviceProfile>,
    network: Option<NetworkProfile>,
}

/// Sole writer of the shared `QualitySettings`
#[derive(Debug)]
pub struct QualityController {
    config: ControllerConfig,
    state: Mutex<ControllerState>,
    publisher: QualityPublisher,
}

impl QualityController {
    pub fn new(config: ControllerConfig, initial_tier: QualityTier) -> Self {
        let (publisher, _) = quality_channel(QualitySettings::for_tier(initial_tier));
        info!("Quality controller starting at {:?}", initial_tier);
        Self {
            state: Mutex::new(ControllerState {
                tier: initial_tier,
                window: SampleWindow::new(config.window_size),
                last_downgrade_at: None,
                last_upgrade_at: None,
                device: None,
                network: None,
            }),
            config,
            publisher,
        }
    }

    /// Starting tier taken from the device compute score
    pub fn for_device(config: ControllerConfig, device: DeviceProfile) -> Self {
        let controller = Self::new(config, QualityTier::for_compute_score(device.compute_score));
        controller.update_device(device);
        controller
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn reader(&self) -> QualityReader {
        self.publisher.reader()
    }

    /// Read-only snapshot of the published settings
    pub fn settings(&self) -> QualitySettings {
        self.publisher.current()
    }

    pub fn tier(&self) -> QualityTier {
        self.lock().tier
    }

    pub fn report_sample(&self, sample: PerformanceSample) {
        self.lock().window.push(sample);
    }

    pub fn update_device(&self, device: DeviceProfile) {
        let mut state = self.lock();
        state.device = Some(device);
        self.publish(&state);
    }

    pub fn update_network(&self, network: NetworkProfile) {
        let mut state = self.lock();
        state.network = Some(network);
        self.publish(&state);
    }

    /// Force a tier, e.g. one restored from a persisted record
    pub fn set_tier(&self, tier: QualityTier) {
        let mut state = self.lock();
        if state.tier != tier {
            info!("Quality tier set to {:?}", tier);
            state.tier = tier;
            state.window.clear();
        }
        self.publish(&state);
    }

    /// One step of the control loop. Never fails; without enough samples the
    /// current settings stay in place.
    pub fn evaluate(&self, now: Instant) -> Option<TierChange> {
        let mut state = self.lock();
        let averages = state.window.averages()?;
        if averages.samples < self.config.min_samples.max(1) {
            return None;
        }

        let change = self
            .downgrade(&state, &averages)
            .or_else(|| self.upgrade(&state, &averages, now))?;

        if change.is_upgrade() {
            state.last_upgrade_at = Some(now);
        } else {
            state.last_downgrade_at = Some(now);
        }
        state.tier = change.to;
        state.window.clear();
        info!(
            "Quality tier {:?} -> {:?} ({:?}, avg {:.1} fps, mem {:.2})",
            change.from, change.to, change.reason, averages.fps, averages.memory_usage_ratio
        );
        self.publish(&state);
        Some(change)
    }

    fn downgrade(&self, state: &ControllerState, averages: &WindowAverages) -> Option<TierChange> {
        let reason = if averages.memory_usage_ratio > self.config.downgrade_memory_ratio {
            ChangeReason::MemoryPressure
        } else if averages.fps < self.fps_floor(state) {
            ChangeReason::LowFps
        } else {
            return None;
        };
        let to = state.tier.downgraded()?;
        Some(TierChange {
            from: state.tier,
            to,
            reason,
        })
    }

    fn upgrade(&self, state: &ControllerState, averages: &WindowAverages, now: Instant) -> Option<TierChange> {
        let next = state.tier.upgraded()?;
        if averages.fps < self.upgrade_threshold(state, next)
            || averages.memory_usage_ratio >= self.config.upgrade_memory_ratio
        {
            return None;
        }

        let cooldown = self.config.upgrade_cooldown();
        let cooled = |at: Option<Instant>| at.map_or(true, |at| now.saturating_duration_since(at) > cooldown);
        if !cooled(state.last_downgrade_at) || !cooled(state.last_upgrade_at) {
            debug!("Upgrade to {:?} held back by cooldown", next);
            return None;
        }

        Some(TierChange {
            from: state.tier,
            to: next,
            reason: ChangeReason::Headroom,
        })
    }

    fn low_battery(&self, state: &ControllerState) -> bool {
        state
            .device
            .is_some_and(|device| device.is_low_battery(self.config.low_battery_threshold))
    }

    /// Target frame rate of `tier` as published, after the battery override
    fn effective_target(&self, state: &ControllerState, tier: QualityTier) -> f32 {
        if self.low_battery(state) {
            lower_fps_notch(tier.target_fps())
        } else {
            tier.target_fps()
        }
    }

    /// A renderer holding the published target never falls below the floor
    fn fps_floor(&self, state: &ControllerState) -> f32 {
        state
            .tier
            .min_fps_floor()
            .min(self.effective_target(state, state.tier))
    }

    /// Average fps that proves headroom for `next`. When the override gives
    /// `next` the same target as the current tier, meeting it shows nothing
    /// and the unlowered target applies.
    fn upgrade_threshold(&self, state: &ControllerState, next: QualityTier) -> f32 {
        let target = self.effective_target(state, next);
        if target > self.effective_target(state, state.tier) {
            target
        } else {
            next.target_fps()
        }
    }

    fn compose(&self, state: &ControllerState) -> QualitySettings {
        let mut settings = QualitySettings::for_tier(state.tier);
        if state.network.is_some_and(|network| network.is_degraded()) {
            settings.preload_aggressiveness = PreloadAggressiveness::Minimal;
        }
        settings.target_fps = self.effective_target(state, state.tier);
        settings
    }

    fn publish(&self, state: &ControllerState) {
        let settings = self.compose(state);
        if self.publisher.publish(settings.clone()) {
            debug!("Published quality settings {:?}", settings);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
