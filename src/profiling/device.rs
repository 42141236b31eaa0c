use crate::error::{AnimationError, AnimationResult};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use sysinfo::System;
use tracing::{debug, info, warn};

/// Assessed capability of the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// `[0, 1]`, higher is faster
    pub compute_score: f32,
    pub memory_available_bytes: u64,
    /// `[0, 1]`
    pub battery_level: f32,
    pub is_charging: bool,
}

impl DeviceProfile {
    /// Used whenever the platform cannot be probed
    pub fn conservative() -> Self {
        Self {
            compute_score: 0.2,
            memory_available_bytes: 0,
            battery_level: 1.0,
            is_charging: false,
        }
    }

    pub fn is_low_battery(&self, threshold: f32) -> bool {
        self.battery_level < threshold && !self.is_charging
    }
}

/// Raw signals reported by the platform layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformSignals {
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub cpu_cores: u32,
    pub battery_level: f32,
    pub is_charging: bool,
}

pub trait PlatformProbe: Send + Sync {
    fn read_signals(&self) -> AnimationResult<PlatformSignals>;
}

/// Maps platform signals to a compute score
pub trait CapabilityScorer: Send + Sync {
    fn score(&self, signals: &PlatformSignals) -> f32;
}

/// Memory and CPU from `sysinfo`. Hosts without a battery report full and charging.
#[derive(Debug, Default)]
pub struct SysinfoProbe;

impl PlatformProbe for SysinfoProbe {
    fn read_signals(&self) -> AnimationResult<PlatformSignals> {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();

        let total_memory_bytes = system.total_memory();
        let cpu_cores = system.cpus().len() as u32;
        if total_memory_bytes == 0 || cpu_cores == 0 {
            return Err(AnimationError::ProfilerUnavailable {
                reason: "system memory or cpu information not reported".to_string(),
            });
        }

        Ok(PlatformSignals {
            total_memory_bytes,
            available_memory_bytes: system.available_memory(),
            cpu_cores,
            battery_level: 1.0,
            is_charging: true,
        })
    }
}

/// One row of the capability table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapabilityClass {
    pub min_memory_gb: u64,
    pub min_cpu_cores: u32,
    pub score: f32,
}

/// Table-driven scorer: the first row whose minimums are met wins
#[derive(Debug, Clone)]
pub struct TableScorer {
    classes: Vec<CapabilityClass>,
    fallback_score: f32,
}

impl TableScorer {
    pub fn new(mut classes: Vec<CapabilityClass>, fallback_score: f32) -> Self {
        classes.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self {
            classes,
            fallback_score,
        }
    }
}

impl Default for TableScorer {
    fn default() -> Self {
        Self::new(
            vec![
                CapabilityClass { min_memory_gb: 12, min_cpu_cores: 8, score: 0.95 },
                CapabilityClass { min_memory_gb: 8, min_cpu_cores: 6, score: 0.75 },
                CapabilityClass { min_memory_gb: 4, min_cpu_cores: 4, score: 0.5 },
                CapabilityClass { min_memory_gb: 2, min_cpu_cores: 2, score: 0.3 },
            ],
            0.15,
        )
    }
}

impl CapabilityScorer for TableScorer {
    fn score(&self, signals: &PlatformSignals) -> f32 {
        let memory_gb = signals.total_memory_bytes / (1024 * 1024 * 1024);
        self.classes
            .iter()
            .find(|class| memory_gb >= class.min_memory_gb && signals.cpu_cores >= class.min_cpu_cores)
            .map(|class| class.score)
            .unwrap_or(self.fallback_score)
    }
}

/// Device assessment cached for a configurable duration
pub struct DeviceProfiler {
    probe: Box<dyn PlatformProbe>,
    scorer: Box<dyn CapabilityScorer>,
    ttl: Duration,
    cached: Mutex<Option<(DeviceProfile, Instant)>>,
}

impl std::fmt::Debug for DeviceProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProfiler")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl DeviceProfiler {
    pub fn new(probe: Box<dyn PlatformProbe>, scorer: Box<dyn CapabilityScorer>, ttl: Duration) -> Self {
        Self {
            probe,
            scorer,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// `SysinfoProbe` with the default table
    pub fn system(ttl: Duration) -> Self {
        Self::new(Box::new(SysinfoProbe), Box::new(TableScorer::default()), ttl)
    }

    pub fn assess(&self) -> DeviceProfile {
        self.assess_at(Instant::now())
    }

    /// Cached profile if younger than the TTL, otherwise a fresh probe.
    /// Probe failures yield the conservative profile, which is not cached.
    pub fn assess_at(&self, now: Instant) -> DeviceProfile {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((profile, at)) = *cached {
            if now.saturating_duration_since(at) < self.ttl {
                debug!("Using cached device profile (score {:.2})", profile.compute_score);
                return profile;
            }
        }

        match self.probe.read_signals() {
            Ok(signals) => {
                let profile = DeviceProfile {
                    compute_score: self.scorer.score(&signals).clamp(0.0, 1.0),
                    memory_available_bytes: signals.available_memory_bytes,
                    battery_level: signals.battery_level.clamp(0.0, 1.0),
                    is_charging: signals.is_charging,
                };
                info!(
                    "Device assessed: {} cores, {}MB total, score {:.2}",
                    signals.cpu_cores,
                    signals.total_memory_bytes / (1024 * 1024),
                    profile.compute_score
                );
                *cached = Some((profile, now));
                profile
            }
            Err(e) => {
                warn!("Device probe failed, using conservative profile: {}", e);
                DeviceProfile::conservative()
            }
        }
    }

    /// Live memory and battery signals paired with a known compute score, so a
    /// restored benchmark still sees the current power state. Not cached;
    /// `None` when the platform cannot be probed.
    pub fn live_profile(&self, compute_score: f32) -> Option<DeviceProfile> {
        match self.probe.read_signals() {
            Ok(signals) => Some(DeviceProfile {
                compute_score: compute_score.clamp(0.0, 1.0),
                memory_available_bytes: signals.available_memory_bytes,
                battery_level: signals.battery_level.clamp(0.0, 1.0),
                is_charging: signals.is_charging,
            }),
            Err(e) => {
                warn!("Device probe failed, battery override unavailable: {}", e);
                None
            }
        }
    }

    /// Drop the cached profile so the next assessment probes again
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
