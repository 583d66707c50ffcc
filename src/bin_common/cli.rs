//! CLI utilities for binaries
//!
//! Handles configuration loading and environment variables
//! for all binary executables.

use resocket::{load_options, ConfigError, ConnectionOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable holding the endpoint URL
pub const ENDPOINT_ENV_VAR: &str = "RESOCKET_URL";

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Connection options (config/connection.yaml)
    Connection,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Connection => "config/connection.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Connection => "RESOCKET_CONFIG_PATH",
            ConfigType::Custom(_) => "RESOCKET_CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use resocket_tools::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Connection);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Load connection options, falling back to defaults if the file is absent
///
/// A file that exists but does not parse or validate is an error.
pub fn load_connection_options(path: &Path) -> Result<ConnectionOptions, ConfigError> {
    if !path.exists() {
        info!("No config at {}, using default options", path.display());
        return Ok(ConnectionOptions::default());
    }
    load_options(path)
}

/// Endpoint from the first argument, else from `RESOCKET_URL`
pub fn endpoint_from_env(args: &[String]) -> Option<String> {
    args.first()
        .filter(|url| !url.is_empty())
        .cloned()
        .or_else(|| std::env::var(ENDPOINT_ENV_VAR).ok())
        .filter(|url| !url.is_empty())
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
