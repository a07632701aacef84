use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use typist_core::config::LOG_FILENAME;
use typist_core::Result;

/// Keeps the file writer alive. Dropping it flushes the log.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Log to `daemon.log` in `config_dir`, and to stderr as well when
/// `to_stderr` is set (foreground runs).
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init(config_dir: &Path, to_stderr: bool) -> Result<LoggingGuard> {
    fs::create_dir_all(config_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_dir.join(LOG_FILENAME))?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    // A second init in the same process (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
