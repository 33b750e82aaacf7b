//! Tracing subscriber setup.
//!
//! Logs go to a daily file under the logs directory so they never interleave
//! with the REPL. Without a usable log directory, warnings and errors go to
//! stderr instead.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "concierge.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_level`. Keep the returned guard alive for
/// the lifetime of the program, or buffered lines are lost on exit.
pub fn init(logs_dir: Option<&Path>, default_level: &str) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(dir) = logs_dir
        && std::fs::create_dir_all(dir).is_ok()
    {
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .try_init();
        return Some(guard);
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_writer(std::io::stderr)
        .try_init();
    None
}
