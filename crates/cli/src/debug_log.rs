//! Session file logging for dropsync
//!
//! Every run writes a trace log to `<log dir>/dropsync-{session_id}.log`
//! next to the console output. The session ID is a UUID generated at startup.

use std::path::{Path, PathBuf};

use color_eyre::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Keeps the background log writer alive; logs written after it is dropped
/// are lost
pub struct DebugLogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Session info returned after initializing logging
pub struct SessionInfo {
    pub log_path: PathBuf,
    pub guard: DebugLogGuard,
}

/// Initialize combined logging: file (detailed) + console (concise).
///
/// The guard must be kept alive for the duration of the program.
///
/// # Errors
/// Returns an error if the log directory or file cannot be created, or if a
/// global subscriber is already installed.
pub fn init(verbose: bool, log_dir: &Path) -> Result<SessionInfo> {
    std::fs::create_dir_all(log_dir)?;
    let prefix = format!("dropsync-{}", uuid::Uuid::new_v4());
    let log_path = log_dir.join(format!("{prefix}.log"));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer: everything from our crates, with source locations
    let file_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "warn,dropsync=trace,dropsync_core=trace,dropsync_transport=trace",
        )
    });
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(file_filter);

    let console_level = if verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_level);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(SessionInfo {
        log_path,
        guard: DebugLogGuard { _guard: guard },
    })
}
