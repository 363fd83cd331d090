//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::generators::GeneratorKind;
use crate::hub::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig::new(self.host.clone(), self.port)
    }
}

/// Broadcast hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default)]
    pub generator: GeneratorKind,
}

fn default_tick_interval() -> u64 {
    3000 // 3 seconds
}

fn default_grace_period() -> u64 {
    1000
}

fn default_write_timeout() -> u64 {
    1000
}

fn default_client_buffer() -> usize {
    16
}

fn default_max_connections() -> usize {
    1000
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            grace_period_ms: default_grace_period(),
            write_timeout_ms: default_write_timeout(),
            client_buffer: default_client_buffer(),
            max_connections: default_max_connections(),
            generator: GeneratorKind::default(),
        }
    }
}

impl BroadcastConfig {
    pub fn to_hub_config(&self) -> HubConfig {
        HubConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            grace_period: Duration::from_millis(self.grace_period_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            client_buffer: self.client_buffer,
            max_connections: self.max_connections,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("streamcast").join("config.toml")),
            Some(PathBuf::from("/etc/streamcast/config.toml")),
            Some(PathBuf::from("./streamcast.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject settings the hub cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let broadcast = &self.broadcast;
        let checks = [
            (broadcast.tick_interval_ms == 0, "broadcast.tick_interval_ms must be greater than 0"),
            (broadcast.write_timeout_ms == 0, "broadcast.write_timeout_ms must be greater than 0"),
            (broadcast.client_buffer == 0, "broadcast.client_buffer must be greater than 0"),
            (broadcast.max_connections == 0, "broadcast.max_connections must be greater than 0"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(ConfigError::Invalid(reason.to_string())),
            None => Ok(()),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("STREAMCAST_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("STREAMCAST_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Broadcast overrides
        if let Ok(generator) = std::env::var("STREAMCAST_GENERATOR") {
            match generator.parse() {
                Ok(kind) => self.broadcast.generator = kind,
                Err(e) => tracing::warn!("Ignoring STREAMCAST_GENERATOR: {}", e),
            }
        }
        if let Ok(interval) = std::env::var("STREAMCAST_TICK_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.broadcast.tick_interval_ms = ms;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("STREAMCAST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("STREAMCAST_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Streamcast Configuration
#
# Environment variables override these settings:
# - STREAMCAST_HOST
# - STREAMCAST_PORT
# - STREAMCAST_GENERATOR
# - STREAMCAST_TICK_INTERVAL_MS
# - STREAMCAST_LOG_LEVEL
# - STREAMCAST_LOG_FORMAT

[server]
# Address to bind to
host = "127.0.0.1"

# Port to listen on
port = 3000

[broadcast]
# Time between events on a stream (ms)
tick_interval_ms = 3000

# Delay between a stream's final event and closing its clients (ms)
grace_period_ms = 1000

# A client that cannot accept an event within this time is dropped (ms)
write_timeout_ms = 1000

# Events buffered per client
client_buffer = 16

# Maximum concurrent clients across all streams
max_connections = 1000

# Event source: "transcript" (scripted call, then summary) or "random" (endless)
generator = "transcript"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
