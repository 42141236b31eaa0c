pub mod settings;
pub mod concurrency;

// Re-export commonly used types
pub use settings::{
    CacheConfig, EngineConfig, LoaderConfig, LoggingConfig, PersistenceConfig, ProfilerConfig,
    default_state_dir, engine_config_path, load_engine_config, save_engine_config, save_engine_config_to,
};
pub use concurrency::RuntimeConfig;
pub use crate::quality::ControllerConfig;
