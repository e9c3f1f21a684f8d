use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "coffee-finder.log";
const DEFAULT_FILTER: &str = "info";

/// Routes `tracing` output to `logs/coffee-finder.log`, rotated daily.
///
/// The terminal belongs to the TUI, so nothing is written to stdout/stderr.
/// `RUST_LOG` overrides the default `info` filter. Keep the returned guard
/// alive for the whole run or buffered lines are lost.
pub fn initialize_logging() -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("coffee-finder: cannot create {LOG_DIR}/: {e}");
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(LOG_DIR, LOG_FILE));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .init();

    tracing::info!(dir = LOG_DIR, file = LOG_FILE, "Logging ready.");
    guard
}
