//! dropsync configuration file parsing (dropsync.toml)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Config file looked up in the working directory when none is given
pub const CONFIG_FILE: &str = "dropsync.toml";

/// Port the server listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 65431;

/// Transfer chunk size unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Whole configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DropsyncConfig {
    /// Bytes per read/write while streaming file bodies
    pub chunk_size: usize,
    pub server: ServerSection,
    pub client: ClientSection,
}

/// `[server]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub root: PathBuf,
}

/// `[client]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub server: String,
    pub root: PathBuf,
    pub poll_interval_ms: u64,
    pub fetch_attempts: u32,
}

impl Default for DropsyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            server: ServerSection::default(),
            client: ClientSection::default(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            root: PathBuf::from("server_dir"),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            server: format!("127.0.0.1:{DEFAULT_PORT}"),
            root: PathBuf::from("client_dir"),
            poll_interval_ms: 500,
            fetch_attempts: 3,
        }
    }
}

impl DropsyncConfig {
    /// Load the configuration.
    ///
    /// With an explicit path the file must exist. Without one,
    /// `dropsync.toml` in the working directory is used if present and the
    /// defaults otherwise.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|e| SyncError::fs(&path, e))?;
        Self::parse(&content).map_err(|message| SyncError::Config { path, message })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.chunk_size == 0 {
            return Err("chunk_size must be at least 1".to_string());
        }
        if config.client.fetch_attempts == 0 {
            return Err("client.fetch_attempts must be at least 1".to_string());
        }
        if config.client.poll_interval_ms == 0 {
            return Err("client.poll_interval_ms must be at least 1".to_string());
        }
        Ok(config)
    }

    /// Plain values handed to the server
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.server.bind,
            root: self.server.root.clone(),
            chunk_size: self.chunk_size,
        }
    }

    /// Plain values handed to the client
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server: self.client.server.clone(),
            root: self.client.root.clone(),
            poll_interval: Duration::from_millis(self.client.poll_interval_ms),
            fetch_attempts: self.client.fetch_attempts,
            chunk_size: self.chunk_size,
        }
    }
}

/// Everything a sync server needs to run
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub root: PathBuf,
    pub chunk_size: usize,
}

/// Everything a sync client needs to run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the server
    pub server: String,
    pub root: PathBuf,
    pub poll_interval: Duration,
    /// How often the remote listing is requested before a pass gives up
    pub fetch_attempts: u32,
    pub chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        DropsyncConfig::default().server_config()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        DropsyncConfig::default().client_config()
    }
}
