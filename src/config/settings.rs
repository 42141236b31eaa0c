use crate::assets::EvictionPolicy;
use crate::error::{AnimationError, AnimationResult};
use crate::profiling::ProbePlan;
use crate::quality::ControllerConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENGINE_CONFIG_FILE: &str = "frameflow.toml";
const ENV_PREFIX: &str = "FRAMEFLOW";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub budget_bytes: u64,
    pub eviction: EvictionPolicy,
    /// Unpinned entries untouched for longer are dropped by maintenance
    pub idle_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 64 * 1024 * 1024,
            eviction: EvictionPolicy::default(),
            idle_ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub retry_jitter_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 5000,
            max_retries: 2,
            retry_backoff_ms: 100,
            retry_jitter_ms: 50,
        }
    }
}

impl LoaderConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub device_cache_ttl_secs: u64,
    /// Endpoint for latency probes; without one the network is assessed from the link kind alone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    pub probe_history: usize,
    pub probes_per_assessment: usize,
    pub probe_timeout_ms: u64,
    pub cellular_fast_ms: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            device_cache_ttl_secs: 24 * 60 * 60,
            probe_url: None,
            probe_history: 5,
            probes_per_assessment: 3,
            probe_timeout_ms: 2000,
            cellular_fast_ms: 150,
        }
    }
}

impl ProfilerConfig {
    pub fn device_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.device_cache_ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    pub fn probe_plan(&self) -> ProbePlan {
        ProbePlan {
            history_len: self.probe_history.max(1),
            probes_per_assessment: self.probes_per_assessment.max(1),
            probe_timeout: self.probe_timeout(),
            cellular_fast_ms: self.cellular_fast_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    /// Overrides the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub loader: LoaderConfig,
    pub controller: ControllerConfig,
    pub profiler: ProfilerConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Compiled defaults, then the TOML file at `path` if it exists, then
    /// `FRAMEFLOW__SECTION__KEY` environment variables
    pub fn load(path: Option<&Path>) -> AnimationResult<Self> {
        let mut builder = ::config::Config::builder().add_source(::config::Config::try_from(&EngineConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path.to_path_buf())
                    .format(::config::FileFormat::Toml)
                    .required(false),
            );
        }
        let config = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<EngineConfig>()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnimationResult<()> {
        let policy = &self.cache.eviction;
        if !(0.0..=1.0).contains(&policy.floor_ratio) {
            return Err(AnimationError::Config {
                reason: format!("eviction floor_ratio {} outside [0, 1]", policy.floor_ratio),
            });
        }
        if !(policy.fraction > 0.0 && policy.fraction <= 1.0) {
            return Err(AnimationError::Config {
                reason: format!("eviction fraction {} outside (0, 1]", policy.fraction),
            });
        }
        if self.controller.window_size == 0 {
            return Err(AnimationError::Config {
                reason: "controller window_size must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "frameflow", "frameflow")
}

/// Location of the engine config file under the platform config directory
pub fn engine_config_path() -> Option<PathBuf> {
    project_dirs().map(|proj| proj.config_dir().join(ENGINE_CONFIG_FILE))
}

/// Platform data directory used for persisted controller state
pub fn default_state_dir() -> Option<PathBuf> {
    project_dirs().map(|proj| proj.data_dir().to_path_buf())
}

pub fn save_engine_config_to(config: &EngineConfig, path: &Path) -> AnimationResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(config).map_err(|e| AnimationError::Config {
        reason: e.to_string(),
    })?;
    fs::write(path, toml)?;
    Ok(())
}

pub fn save_engine_config(config: &EngineConfig) -> AnimationResult<()> {
    match engine_config_path() {
        Some(path) => save_engine_config_to(config, &path),
        None => Err(AnimationError::Config {
            reason: "no platform config directory".to_string(),
        }),
    }
}

/// Layered load using the platform config file
pub fn load_engine_config() -> AnimationResult<EngineConfig> {
    EngineConfig::load(engine_config_path().as_deref())
}
