//! dropsync: keep a server directory identical to a local one
//!
//! - BLAKE3 content fingerprints
//! - Content already on the server is copied or moved there, never resent
//! - Plain TCP, one request at a time, every request acknowledged
//! - Polling watch loop with single-flight passes

mod debug_log;
mod progress;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand, ValueEnum, builder::Styles};
use color_eyre::Result;
use tracing::{debug, info};

use dropsync_core::{ClientConfig, DropsyncConfig, Scanner, ServerConfig, SyncRoot};
use dropsync_transport::{ServiceHandle, SyncClient, SyncServer, TcpConnector, start};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser)]
#[command(name = "dropsync")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Mirror a local directory to a dropsync server")]
#[command(long_about = r#"
dropsync keeps a server directory identical to a local one.

Features:
  • Content reuse - files already on the server are copied or moved, not resent
  • Renames       - a local rename becomes a single remote move
  • Acknowledged  - every request gets an Ok or an Error back
  • Safe cleanup  - nothing is deleted until every transfer succeeded

Examples:
  dropsync serve --root ./server_dir                 Run a server in the foreground
  dropsync watch ./client_dir -s 127.0.0.1:65431     Continuous sync
  dropsync sync ./client_dir                         One pass, then exit
  dropsync plan ./client_dir                         Show what a pass would do
  dropsync scan ./client_dir                         Fingerprint a directory
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./dropsync.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for session log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where to sync from and to
#[derive(Args, Debug, Default)]
struct Endpoints {
    /// Local directory path
    local: Option<PathBuf>,

    /// Server address (host:port)
    #[arg(short, long)]
    server: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Summary,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the local directory and sync every change
    Watch {
        #[command(flatten)]
        endpoints: Endpoints,

        /// Poll interval in milliseconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run one sync pass and exit
    Sync {
        #[command(flatten)]
        endpoints: Endpoints,
    },

    /// Print the actions a sync pass would run, without running them
    Plan {
        #[command(flatten)]
        endpoints: Endpoints,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },

    /// Scan a directory and print its snapshot
    Scan {
        /// Directory to scan
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },

    /// Serve a directory in the foreground
    Serve {
        /// Directory to keep in sync
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Listen address
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Show version and build info
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        eprintln!("dropsync {}", env!("CARGO_PKG_VERSION"));
        eprintln!("Built with Rust {}", env!("CARGO_PKG_RUST_VERSION"));
        return Ok(());
    }

    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("dropsync"));
    let session = debug_log::init(cli.verbose, &log_dir)?;
    debug!("session log at {}", session.log_path.display());

    let config = DropsyncConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Version => {}
        Commands::Watch {
            endpoints,
            interval,
        } => {
            let mut client_config = client_config(&config, endpoints);
            if let Some(ms) = interval {
                client_config.poll_interval = Duration::from_millis(ms.max(1));
            }
            watch_command(client_config).await?;
        }
        Commands::Sync { endpoints } => {
            let config = client_config(&config, endpoints);
            let client = connect(client_root(&config)?, config);
            progress::print_outcome(&client.sync_once().await?);
        }
        Commands::Plan { endpoints, format } => {
            let config = client_config(&config, endpoints);
            let client = connect(SyncRoot::open(&config.root)?, config);
            let plan = client.preview().await?;
            match format {
                Format::Summary => progress::print_plan(&plan),
                Format::Json => {
                    let json = serde_json::json!({
                        "transfers": plan.transfers,
                        "cleanup": plan.cleanup,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
            }
        }
        Commands::Scan { path, format } => scan_command(&path, format)?,
        Commands::Serve { root, bind } => {
            serve_command(server_config(&config, root, bind)).await?;
        }
    }

    drop(session.guard);
    Ok(())
}

/// File config with command-line overrides applied
fn client_config(config: &DropsyncConfig, endpoints: Endpoints) -> ClientConfig {
    let mut client = config.client_config();
    if let Some(local) = endpoints.local {
        client.root = local;
    }
    if let Some(server) = endpoints.server {
        client.server = server;
    }
    client
}

fn server_config(
    config: &DropsyncConfig,
    root: Option<PathBuf>,
    bind: Option<SocketAddr>,
) -> ServerConfig {
    let mut server = config.server_config();
    if let Some(root) = root {
        server.root = root;
    }
    if let Some(bind) = bind {
        server.bind = bind;
    }
    server
}

/// Root a sync writes from, created when missing
fn client_root(config: &ClientConfig) -> Result<SyncRoot> {
    Ok(SyncRoot::create(&config.root)?)
}

fn connect(local: SyncRoot, config: ClientConfig) -> SyncClient {
    let connector = TcpConnector::new(config.server.clone(), config.chunk_size);
    SyncClient::new(connector, local, config)
}

async fn watch_command(config: ClientConfig) -> Result<()> {
    info!(
        "Watching {} -> {} every {:?}",
        config.root.display(),
        config.server,
        config.poll_interval
    );
    let client = connect(client_root(&config)?, config);
    run_until_interrupted(start(Arc::new(client))).await
}

async fn serve_command(config: ServerConfig) -> Result<()> {
    let server = SyncServer::bind(&config).await?;
    run_until_interrupted(start(Arc::new(server))).await
}

async fn run_until_interrupted(handle: ServiceHandle) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Interrupted, stopping {}", handle.name());
    handle.stop().await?;
    Ok(())
}

fn scan_command(path: &Path, format: Format) -> Result<()> {
    info!("Scanning {}...", path.display());
    let snapshot = Scanner::new(path).scan()?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Format::Summary => {
            let sizes: Vec<(String, u64)> = snapshot
                .paths()
                .map(|rel| {
                    let size = std::fs::metadata(rel.to_native(path)).map_or(0, |m| m.len());
                    (rel.to_string(), size)
                })
                .collect();
            progress::print_scan(sizes.len(), sizes.iter().map(|(_, s)| s).sum());

            if sizes.len() <= 20 {
                for (rel, size) in &sizes {
                    println!(
                        "  {rel} ({})",
                        humansize::format_size(*size, humansize::BINARY)
                    );
                }
            }
        }
    }

    Ok(())
}
