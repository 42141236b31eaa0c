use crate::config::LoggingConfig;
use crate::error::AnimationResult;
use std::fs;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level with this crate at debug
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("{},frameflow=debug", config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Install the console layer and, if configured, a plain-text file layer.
/// Calling it again once a subscriber is set is a no-op.
pub fn init_logging(config: &LoggingConfig) -> AnimationResult<()> {
    let file_layer = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let log_file = fs::File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(log_file))
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_ansi(false), // No ANSI codes in file
            )
        }
        None => None,
    };

    let initialized = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(config.ansi),
        )
        .with(file_layer)
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("Logging initialized with level: {}", config.level);
        if let Some(path) = &config.file {
            tracing::info!("File logging enabled: {}", path.display());
        }
    }
    Ok(())
}

/// Log host information for debugging
pub fn log_system_info() {
    tracing::info!("=== System Information ===");
    tracing::info!("OS: {}", std::env::consts::OS);
    tracing::info!("Architecture: {}", std::env::consts::ARCH);
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Logical CPUs: {}", num_cpus::get());
    tracing::info!("========================");
}
