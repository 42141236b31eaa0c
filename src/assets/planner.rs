//! Preload planning: how many frames of an asset to materialize eagerly.

use super::types::{Asset, PriorityTier};
use crate::quality::QualitySettings;

/// Deterministic, side-effect free preload policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PreloadPlanner;

impl PreloadPlanner {
    /// Frame budget for a priority tier before any capping
    pub fn base_count(tier: PriorityTier) -> u32 {
        match tier {
            PriorityTier::High => 15,
            PriorityTier::Medium => 8,
            PriorityTier::Low => 3,
        }
    }

    /// Frames to preload for `asset` at its declared priority
    pub fn frames_to_load(asset: &Asset, headroom_bytes: u64, settings: &QualitySettings) -> u32 {
        Self::frames_to_load_at(asset, asset.priority, headroom_bytes, settings)
    }

    /// Frames to preload when the caller requests a specific priority
    pub fn frames_to_load_at(
        asset: &Asset,
        tier: PriorityTier,
        headroom_bytes: u64,
        settings: &QualitySettings,
    ) -> u32 {
        let affordable = match asset.estimated_bytes_per_frame {
            0 => u64::from(u32::MAX),
            per_frame => headroom_bytes / per_frame,
        };
        let affordable = u32::try_from(affordable).unwrap_or(u32::MAX);

        let planned = Self::base_count(tier)
            .min(asset.frame_count)
            .min(affordable);
        if planned == 0 {
            return 0;
        }

        let scaled = (planned as f64 * settings.preload_aggressiveness.multiplier()).round() as u32;
        scaled.max(1).min(asset.frame_count).min(affordable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::types::AssetCategory;
    use crate::quality::{PreloadAggressiveness, QualityTier};

    fn asset(frames: u32, bytes: u64, tier: PriorityTier) -> Asset {
        Asset::new("a", "g", AssetCategory::Effect, frames, bytes, tier)
    }

    fn balanced() -> QualitySettings {
        QualitySettings::for_tier(QualityTier::Medium)
    }

    fn with_aggressiveness(aggressiveness: PreloadAggressiveness) -> QualitySettings {
        QualitySettings {
            preload_aggressiveness: aggressiveness,
            ..balanced()
        }
    }

    #[test]
    fn test_base_count_by_tier() {
        let plenty = 100_000_000;
        assert_eq!(PreloadPlanner::frames_to_load(&asset(20, 100, PriorityTier::High), plenty, &balanced()), 15);
        assert_eq!(PreloadPlanner::frames_to_load(&asset(20, 100, PriorityTier::Medium), plenty, &balanced()), 8);
        assert_eq!(PreloadPlanner::frames_to_load(&asset(20, 100, PriorityTier::Low), plenty, &balanced()), 3);
    }

    #[test]
    fn test_capped_by_frame_count() {
        let short = asset(5, 100, PriorityTier::High);
        assert_eq!(PreloadPlanner::frames_to_load(&short, u64::MAX, &balanced()), 5);
        let aggressive = with_aggressiveness(PreloadAggressiveness::Aggressive);
        assert_eq!(PreloadPlanner::frames_to_load(&short, u64::MAX, &aggressive), 5);
    }

    #[test]
    fn test_capped_by_headroom() {
        let high = asset(20, 100_000, PriorityTier::High);
        assert_eq!(PreloadPlanner::frames_to_load(&high, 450_000, &balanced()), 4);
        assert_eq!(PreloadPlanner::frames_to_load(&high, 99_999, &balanced()), 0);
    }

    #[test]
    fn test_aggressiveness_scaling() {
        let high = asset(40, 100, PriorityTier::High);
        let minimal = with_aggressiveness(PreloadAggressiveness::Minimal);
        let aggressive = with_aggressiveness(PreloadAggressiveness::Aggressive);

        assert_eq!(PreloadPlanner::frames_to_load(&high, u64::MAX, &minimal), 5);
        assert_eq!(PreloadPlanner::frames_to_load(&high, u64::MAX, &aggressive), 23);
        // Low tier under minimal still warms one frame
        let low = asset(40, 100, PriorityTier::Low);
        assert_eq!(PreloadPlanner::frames_to_load(&low, u64::MAX, &minimal), 1);
    }

    #[test]
    fn test_aggressive_never_exceeds_headroom() {
        let high = asset(40, 1_000, PriorityTier::High);
        let aggressive = with_aggressiveness(PreloadAggressiveness::Aggressive);
        assert_eq!(PreloadPlanner::frames_to_load(&high, 16_000, &aggressive), 16);
    }

    #[test]
    fn test_requested_priority_overrides_declared() {
        let low = asset(20, 100, PriorityTier::Low);
        assert_eq!(PreloadPlanner::frames_to_load_at(&low, PriorityTier::High, u64::MAX, &balanced()), 15);
    }
}
