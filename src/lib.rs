// frameflow: frame-sequence animation cache with adaptive quality control
// Bounded memory, bounded concurrency, no thrashing

pub mod utils;
pub mod error;
pub mod config;
pub mod assets;
pub mod quality;
pub mod profiling;
pub mod persistence;
pub mod engine;

// Re-export commonly used types for convenience
pub use error::{AnimationError, AnimationResult};
pub use assets::{
    Asset, AssetCache, AssetCatalog, AssetCategory, AssetId, CacheStats, FileFrameSource, FrameHandle,
    FrameSource, PreloadReport, PriorityTier,
};
pub use quality::{PerformanceSample, QualityController, QualitySettings, QualityTier};
pub use config::EngineConfig;
pub use engine::{AnimationEngine, AnimationEngineBuilder, MaintenanceHandle};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
