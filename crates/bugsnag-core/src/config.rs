//! Configuration management for bugsnag-mcp.
//!
//! The server needs two values: the Bugsnag personal auth token and the API
//! endpoint. They are resolved from, in increasing priority:
//!
//! 1. built-in defaults (endpoint only),
//! 2. an optional TOML file (`~/.config/bugsnag-mcp/config.toml` on Linux,
//!    or the path given on the command line),
//! 3. the `BUGSNAG_AUTH_TOKEN` and `BUGSNAG_ENDPOINT` environment variables.
//!
//! # Example
//!
//! ```ignore
//! use bugsnag_core::Config;
//!
//! let config = Config::load(None)?;
//! println!("talking to {}", config.endpoint);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "bugsnag-mcp";

/// Default Bugsnag Data Access API URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.bugsnag.com";

/// Environment variable holding the auth token.
pub const AUTH_TOKEN_VAR: &str = "BUGSNAG_AUTH_TOKEN";

/// Environment variable overriding the API endpoint.
pub const ENDPOINT_VAR: &str = "BUGSNAG_ENDPOINT";

// =============================================================================
// Configuration structures
// =============================================================================

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Bugsnag personal auth token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Bugsnag API base URL (for on-premise installations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Fully resolved configuration.
#[derive(Clone, PartialEq)]
pub struct Config {
    pub auth_token: String,
    pub endpoint: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// =============================================================================
// ConfigFile implementation
// =============================================================================

impl ConfigFile {
    /// Get the configuration directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    /// Get the default configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Load the configuration file from the default location.
    ///
    /// Returns an empty config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            debug!("Could not determine config directory, skipping config file");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load the configuration file from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: ConfigFile = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Load configuration from the given file (or the default location) and
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a config file with values from `lookup` (usually the environment).
    ///
    /// Fails when no non-empty auth token is available from either source.
    pub fn resolve<F>(file: ConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let auth_token = non_empty(lookup(AUTH_TOKEN_VAR))
            .or_else(|| non_empty(file.auth_token))
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} is not set; a Bugsnag personal auth token is required",
                    AUTH_TOKEN_VAR
                ))
            })?;

        let endpoint = non_empty(lookup(ENDPOINT_VAR))
            .or_else(|| non_empty(file.endpoint))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            auth_token,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}
