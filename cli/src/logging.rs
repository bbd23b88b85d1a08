//! Tracing subscriber setup

use conductor_infrastructure::config::FileLoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter from `-v` count, else `RUST_LOG`, else the configured level.
fn filter(verbose: u8, config: &FileLoggingConfig) -> EnvFilter {
    let level = match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };
    match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_deref().unwrap_or("warn"))),
    }
}

/// Install the global subscriber. The returned guard must live until exit
/// so the file writer flushes.
pub fn init(verbose: u8, config: &FileLoggingConfig) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "conductor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter(verbose, config))
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter(verbose, config))
                .with(stderr_layer)
                .init();
            None
        }
    }
}
