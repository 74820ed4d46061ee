//! Configuration for the pathfinding server.
//!
//! Loaded once at startup from a JSON file:
//!
//! ```json
//! {
//!   "IpAddress": "127.0.0.1",
//!   "Port": 47110,
//!   "MmapsFolder": "mmaps/",
//!   "PreloadMaps": [0, 1],
//!   "MaxClients": 0,
//!   "MaxLineLength": 65536,
//!   "SerializeEngine": false
//! }
//! ```
//!
//! Every key is optional. A missing file is created with the defaults.
//! Afterwards two environment variables may override the file:
//!
//! - `PATH_SERVER_ADDR` (IpAddress)
//! - `PATH_SERVER_PORT` (Port)

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub ip_address: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Folder holding the mesh files. Always ends with a separator.
    pub mmaps_folder: String,

    /// Maps loaded before the listener starts.
    pub preload_maps: Vec<i32>,

    /// Maximum number of simultaneously connected clients. `0` = no limit.
    pub max_clients: usize,

    /// Longest request line accepted, in bytes.
    pub max_line_length: usize,

    /// Run all engine calls under one lock.
    pub serialize_engine: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ip_address: "127.0.0.1".to_string(),
            port: 47110,
            mmaps_folder: "mmaps/".to_string(),
            preload_maps: Vec::new(),
            max_clients: 0,
            max_line_length: 64 * 1024,
            serialize_engine: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

/// How [`Config::load_or_create`] got its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Loaded,
    /// The file did not exist; defaults were used and written out.
    Created,
}

impl Config {
    /// Read `path`, or write the defaults there if it does not exist.
    ///
    /// Failing to write the default file is not fatal; the defaults are
    /// still returned.
    pub fn load_or_create(path: &Path) -> Result<(Config, ConfigSource), ConfigError> {
        if !path.exists() {
            let config = Config::default();
            match serde_json::to_string_pretty(&config) {
                Ok(text) => {
                    if let Err(e) = fs::write(path, text) {
                        tracing::warn!("could not write default config {}: {}", path.display(), e);
                    }
                }
                Err(e) => tracing::warn!("could not serialize default config: {}", e),
            }
            return Ok((config, ConfigSource::Created));
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        config.mmaps_folder = normalize_folder(&config.mmaps_folder);
        Ok((config, ConfigSource::Loaded))
    }

    /// Apply `PATH_SERVER_ADDR` / `PATH_SERVER_PORT` when set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = env::var("PATH_SERVER_ADDR") {
            self.ip_address = addr;
        }
        self.port = read_env_or_default("PATH_SERVER_PORT", self.port)?;
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }

    pub fn mmaps_path(&self) -> PathBuf {
        PathBuf::from(&self.mmaps_folder)
    }
}

/// Make sure the folder ends with `/` or `\`.
pub fn normalize_folder(folder: &str) -> String {
    if folder.ends_with('/') || folder.ends_with('\\') {
        folder.to_string()
    } else {
        format!("{}/", folder)
    }
}

fn read_env_or_default<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidEnv { key, value: val }),
        Err(_) => Ok(default),
    }
}
