//! dropsync-server: serve a directory to dropsync clients
//!
//! Runs until interrupted. Flags override `dropsync.toml`.

mod debug_log;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::{debug, info};

use dropsync_core::{DropsyncConfig, ServerConfig};
use dropsync_transport::{SyncServer, start};

#[derive(Parser, Debug)]
#[command(name = "dropsync-server")]
#[command(version)]
#[command(about = "Serve a directory to dropsync clients")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./dropsync.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Directory to keep in sync (created if missing)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Directory for session log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self, config: &DropsyncConfig) -> ServerConfig {
        let mut server = config.server_config();
        if let Some(bind) = self.bind {
            server.bind = bind;
        }
        if let Some(root) = &self.root {
            server.root.clone_from(root);
        }
        server
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("dropsync"));
    let session = debug_log::init(cli.verbose, &log_dir)?;
    debug!("session log at {}", session.log_path.display());

    let config = cli.server_config(&DropsyncConfig::load(cli.config.as_deref())?);
    info!("dropsync-server {}", env!("CARGO_PKG_VERSION"));

    let server = SyncServer::bind(&config).await?;
    let handle = start(Arc::new(server));

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, shutting down");
    handle.stop().await?;
    drop(session.guard);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from(["dropsync-server", "-b", "0.0.0.0:4000", "-r", "/srv/sync"])
            .unwrap();
        let config = cli.server_config(&DropsyncConfig::default());
        assert_eq!(config.bind, "0.0.0.0:4000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.root, PathBuf::from("/srv/sync"));
        assert_eq!(config.chunk_size, dropsync_core::config::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_defaults_come_from_config() {
        let cli = Cli::try_parse_from(["dropsync-server"]).unwrap();
        let config = cli.server_config(&DropsyncConfig::default());
        assert_eq!(config.bind.port(), dropsync_core::config::DEFAULT_PORT);
        assert_eq!(config.root, PathBuf::from("server_dir"));
    }
}
