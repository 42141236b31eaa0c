//! Quality tiers and the shared settings record written by the controller.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Ultra,
}

impl Default for QualityTier {
    fn default() -> Self {
        Self::Low
    }
}

impl QualityTier {
    pub fn upgraded(self) -> Option<Self> {
        match self {
            QualityTier::Low => Some(QualityTier::Medium),
            QualityTier::Medium => Some(QualityTier::High),
            QualityTier::High => Some(QualityTier::Ultra),
            QualityTier::Ultra => None,
        }
    }

    pub fn downgraded(self) -> Option<Self> {
        match self {
            QualityTier::Low => None,
            QualityTier::Medium => Some(QualityTier::Low),
            QualityTier::High => Some(QualityTier::Medium),
            QualityTier::Ultra => Some(QualityTier::High),
        }
    }

    /// Frame rate the tier aims for
    pub fn target_fps(self) -> f32 {
        match self {
            QualityTier::Low => 24.0,
            QualityTier::Medium => 30.0,
            QualityTier::High => 60.0,
            QualityTier::Ultra => 60.0,
        }
    }

    /// Average fps below which the tier is abandoned
    pub fn min_fps_floor(self) -> f32 {
        match self {
            QualityTier::Low => 15.0,
            QualityTier::Medium => 24.0,
            QualityTier::High => 45.0,
            QualityTier::Ultra => 55.0,
        }
    }

    pub fn max_concurrent_loads(self) -> usize {
        match self {
            QualityTier::Low => 2,
            QualityTier::Medium => 4,
            QualityTier::High => 6,
            QualityTier::Ultra => 8,
        }
    }

    pub fn preload_aggressiveness(self) -> PreloadAggressiveness {
        match self {
            QualityTier::Low => PreloadAggressiveness::Minimal,
            QualityTier::Medium | QualityTier::High => PreloadAggressiveness::Balanced,
            QualityTier::Ultra => PreloadAggressiveness::Aggressive,
        }
    }

    /// Starting tier for a device compute score in `[0, 1]`
    pub fn for_compute_score(score: f32) -> Self {
        match score {
            s if s >= 0.85 => QualityTier::Ultra,
            s if s >= 0.6 => QualityTier::High,
            s if s >= 0.35 => QualityTier::Medium,
            _ => QualityTier::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreloadAggressiveness {
    Minimal,
    Balanced,
    Aggressive,
}

impl PreloadAggressiveness {
    pub fn multiplier(self) -> f64 {
        match self {
            PreloadAggressiveness::Minimal => 0.3,
            PreloadAggressiveness::Balanced => 1.0,
            PreloadAggressiveness::Aggressive => 1.5,
        }
    }
}

/// Frame-rate steps used when an override lowers the target
const FPS_NOTCHES: [f32; 6] = [15.0, 24.0, 30.0, 60.0, 90.0, 120.0];

/// Next lower fps notch, or the lowest notch
pub fn lower_fps_notch(fps: f32) -> f32 {
    FPS_NOTCHES
        .iter()
        .rev()
        .copied()
        .find(|notch| *notch < fps)
        .unwrap_or(FPS_NOTCHES[0])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub tier: QualityTier,
    pub max_concurrent_loads: usize,
    pub preload_aggressiveness: PreloadAggressiveness,
    pub target_fps: f32,
}

impl QualitySettings {
    pub fn for_tier(tier: QualityTier) -> Self {
        Self {
            tier,
            max_concurrent_loads: tier.max_concurrent_loads(),
            preload_aggressiveness: tier.preload_aggressiveness(),
            target_fps: tier.target_fps(),
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self::for_tier(QualityTier::default())
    }
}

/// Write side of the shared settings. Only the controller holds one.
#[derive(Debug)]
pub struct QualityPublisher {
    sender: watch::Sender<QualitySettings>,
}

/// Read side of the shared settings, handed to the planner and admission gate
#[derive(Debug, Clone)]
pub struct QualityReader {
    receiver: watch::Receiver<QualitySettings>,
}

/// Create the single writer and a reader for the shared settings record
pub fn quality_channel(initial: QualitySettings) -> (QualityPublisher, QualityReader) {
    let (sender, receiver) = watch::channel(initial);
    (QualityPublisher { sender }, QualityReader { receiver })
}

impl QualityPublisher {
    /// Replace the settings, notifying readers only on actual change
    pub fn publish(&self, settings: QualitySettings) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        })
    }

    pub fn current(&self) -> QualitySettings {
        self.sender.borrow().clone()
    }

    pub fn reader(&self) -> QualityReader {
        QualityReader {
            receiver: self.sender.subscribe(),
        }
    }
}

impl QualityReader {
    /// Read-only snapshot of the current settings
    pub fn snapshot(&self) -> QualitySettings {
        self.receiver.borrow().clone()
    }

    pub fn max_concurrent_loads(&self) -> usize {
        self.receiver.borrow().max_concurrent_loads.max(1)
    }

    /// Fresh receiver marked as up to date, for waiting on the next change
    pub(crate) fn watcher(&self) -> watch::Receiver<QualitySettings> {
        let mut receiver = self.receiver.clone();
        receiver.borrow_and_update();
        receiver
    }
}
