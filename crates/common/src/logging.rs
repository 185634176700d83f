//! Logging initialization.

use std::{
    ffi::OsStr,
    path::Path,
};

use tally_config::LoggingConfig;
use tracing::*;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Initializes the tracing subscriber.
///
/// The configured filter is the default; `RUST_LOG` overrides it when set.
/// Returns the file writer's guard when file logging is configured — the
/// caller must keep it alive for the process lifetime or buffered lines are
/// lost on exit.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let stdout_layer = layer().compact().boxed();

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(OsStr::new("tallyd.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = layer()
                .compact()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("logging initialized");
    guard
}
