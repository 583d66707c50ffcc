//! Connection options
//!
//! Options are immutable per connection. Callers override any subset of
//! them, either in code through [`PartialConnectionOptions`] or from a YAML
//! document where missing keys fall back to the defaults:
//!
//! ```yaml
//! should_ping: true
//! ping_timeout: 30
//! should_reconnect: true
//! reconnect_attempts: 5
//! protocols: ["v2.stream"]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default seconds between keepalive pings
pub const DEFAULT_PING_TIMEOUT: u64 = 300;

/// Default number of consecutive reconnect attempts
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// How binary frames are surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryType {
    #[default]
    Blob,
    ArrayBuffer,
}

/// Default keepalive payload: `{"type":"ping"}`
pub fn default_ping_command() -> Value {
    json!({ "type": "ping" })
}

/// Options that shape a managed connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Send `ping_command` periodically while open
    pub should_ping: bool,
    /// Seconds between keepalive pings
    pub ping_timeout: u64,
    /// Payload serialized to JSON text for each ping
    pub ping_command: Value,
    /// Reopen automatically after unexpected closures
    pub should_reconnect: bool,
    /// Consecutive reconnect attempts before giving up
    pub reconnect_attempts: u32,
    /// Sub-protocols offered during the handshake
    pub protocols: Vec<String>,
    pub binary_type: BinaryType,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            should_ping: false,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            ping_command: default_ping_command(),
            should_reconnect: false,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            protocols: Vec::new(),
            binary_type: BinaryType::Blob,
        }
    }
}

impl ConnectionOptions {
    /// Defaults with `overrides` shallow-merged on top
    pub fn merged(overrides: PartialConnectionOptions) -> Self {
        overrides.apply(Self::default())
    }

    /// Parse options from YAML; absent keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    #[inline]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }

    /// The ping payload as sent on the wire
    pub fn ping_payload(&self) -> String {
        self.ping_command.to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.should_ping && self.ping_timeout == 0 {
            return Err(ConfigError::ValidationError(
                "ping_timeout must be greater than zero when should_ping is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load options from a YAML file
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<ConnectionOptions, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    ConnectionOptions::from_yaml_str(&contents)
}

/// Caller overrides; `None` keeps the default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialConnectionOptions {
    pub should_ping: Option<bool>,
    pub ping_timeout: Option<u64>,
    pub ping_command: Option<Value>,
    pub should_reconnect: Option<bool>,
    pub reconnect_attempts: Option<u32>,
    pub protocols: Option<Vec<String>>,
    pub binary_type: Option<BinaryType>,
}

impl PartialConnectionOptions {
    /// Overlay the set fields onto `base`
    pub fn apply(self, base: ConnectionOptions) -> ConnectionOptions {
        ConnectionOptions {
            should_ping: self.should_ping.unwrap_or(base.should_ping),
            ping_timeout: self.ping_timeout.unwrap_or(base.ping_timeout),
            ping_command: self.ping_command.unwrap_or(base.ping_command),
            should_reconnect: self.should_reconnect.unwrap_or(base.should_reconnect),
            reconnect_attempts: self.reconnect_attempts.unwrap_or(base.reconnect_attempts),
            protocols: self.protocols.unwrap_or(base.protocols),
            binary_type: self.binary_type.unwrap_or(base.binary_type),
        }
    }
}
