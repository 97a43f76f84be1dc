use std::path::Path;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingSection;

// Keep the non-blocking writer guards alive for the process lifetime.
static FILE_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

fn level_filter(level: &str) -> EnvFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" | "none" => EnvFilter::new("off"),
        other => EnvFilter::new(other),
    }
}

/// Initialize console (and optional file) logging. `RUST_LOG` wins over the
/// configured console level when set. Safe to call once; later calls are
/// ignored.
pub fn init_logging(config: &LoggingSection, home_dir: &Path) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level_filter(&config.console_level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_filter(console_filter);

    let file_layer = config.file.as_ref().map(|file| {
        let path = home_dir.join(file);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let appender = tracing_appender::rolling::never(
            path.parent().unwrap_or(home_dir),
            path.file_name().unwrap_or_else(|| "workbench.log".as_ref()),
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);

        let file_level = config
            .file_level
            .clone()
            .unwrap_or_else(|| "debug".to_string());
        fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(level_filter(&file_level))
    });

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
