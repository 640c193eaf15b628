//! Logging for the relay
//!
//! The server writes to a daily-rotated `pagepulse.log` under the XDG state
//! directory and mirrors to stderr. `RUST_LOG`, when set, overrides the
//! configured level everywhere, tests included.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Level used by [`init_test`] when `RUST_LOG` is unset.
const TEST_DIRECTIVES: &str = "pagepulse_core=debug";

/// Install the global subscriber for the server.
///
/// Fails if the log directory cannot be created. Keep the returned guard alive
/// for as long as the process should keep logging.
pub fn init(config: &LoggingConfig, stderr: bool) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(rolling_appender(config, &log_dir)?);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    let stderr_layer =
        stderr.then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(env_or(&config.level))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!(
        log_file = %Config::log_path().display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Route this crate's events into the test harness output.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(env_or(TEST_DIRECTIVES))
        .with(fmt::layer().with_test_writer().without_time())
        .try_init();
}

/// `RUST_LOG` if it parses, otherwise `fallback`.
fn env_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn rolling_appender(config: &LoggingConfig, dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pagepulse.log")
        .max_log_files(config.max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("failed to create log appender: {}", e)))
}

/// Flushes buffered log lines when dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}
