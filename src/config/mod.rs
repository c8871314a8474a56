//! Configuration management for notestream.
//!
//! Configuration is read from `~/.config/notestream/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::RemoteSession;
use crate::feed::FeedConfig;
use crate::transport::TransportConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server used when none is named on the command line
    pub default_server: Option<String>,
    pub transport: TransportConfig,
    pub feed: FeedConfig,
    pub servers: Vec<ServerConfig>,
}

/// A server record with its access token.
#[derive(Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub origin: String,
    #[serde(default)]
    pub credential: String,
}

impl ServerConfig {
    pub fn remote(&self) -> RemoteSession {
        RemoteSession::new(self.origin.clone(), self.credential.clone())
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/notestream/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("notestream").join("config.toml"))
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# notestream configuration

# Server used when --server is not given
# default_server = "main"

[transport]
# Pull request deadline in seconds
timeout_secs = 10

# First reconnect delay for the streaming channel (milliseconds),
# doubled on every failed attempt up to max_reconnect_delay_secs
reconnect_base_delay_ms = 1000
max_reconnect_delay_secs = 60

[feed]
# Notes per page
page_limit = 20

# When live notes arrive before the first page:
# "merge" inserts the page behind them, "live-wins" drops the page
initial_page = "merge"

# Drop notes whose id is already shown
dedupe = true

# Servers, one block each
# [[servers]]
# name = "main"
# origin = "https://misskey.example"
# credential = "your-access-token"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
