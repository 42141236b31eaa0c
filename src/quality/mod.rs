pub mod settings;
pub mod samples;
pub mod controller;

pub use settings::{
    lower_fps_notch, quality_channel, PreloadAggressiveness, QualityPublisher, QualityReader,
    QualitySettings, QualityTier,
};
pub use samples::{PerformanceSample, SampleWindow, WindowAverages};
pub use controller::{ChangeReason, ControllerConfig, QualityController, TierChange};
