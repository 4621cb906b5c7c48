//! Session file logging for dropsync-server
//!
//! Each server run logs to `<log dir>/dropsync-server-{session_id}.log`
//! besides the console.

use std::path::{Path, PathBuf};

use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Log file of this run. Dropping `guard` flushes and stops the writer.
pub struct SessionInfo {
    pub log_path: PathBuf,
    pub guard: WorkerGuard,
}

/// Install the file and console layers
///
/// # Errors
/// Returns an error if the log file cannot be created or a global subscriber
/// is already installed.
pub fn init(verbose: bool, log_dir: &Path) -> Result<SessionInfo> {
    std::fs::create_dir_all(log_dir)?;
    let prefix = format!("dropsync-server-{}", uuid::Uuid::new_v4());
    let log_path = log_dir.join(format!("{prefix}.log"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,dropsync_server=trace,dropsync_core=trace,dropsync_transport=trace",
                )
            }),
        );

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(if verbose {
            tracing_subscriber::filter::LevelFilter::DEBUG
        } else {
            tracing_subscriber::filter::LevelFilter::INFO
        });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(SessionInfo { log_path, guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_failures_reach_the_log_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let session = init(true, &dir.path().join("logs")).unwrap();
        tracing::warn!("delete failed: permission denied");
        drop(session.guard);

        assert!(session.log_path.starts_with(dir.path().join("logs")));
        let written = std::fs::read_to_string(&session.log_path).unwrap();
        assert!(written.contains("permission denied"), "{written}");
    }
}
