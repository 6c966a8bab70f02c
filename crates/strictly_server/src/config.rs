//! Server configuration loaded from TOML.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "strictly_gomoku.toml";

/// Runtime configuration for the session server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// How long a dropped participant may take to reconnect.
    #[serde(default = "default_grace_window_ms")]
    grace_window_ms: u64,

    /// Pause before the heuristic opponent answers a move.
    #[serde(default = "default_opponent_think_ms")]
    opponent_think_ms: u64,

    /// Longest accepted display name, in characters.
    #[serde(default = "default_max_name_len")]
    max_name_len: usize,

    /// Display name of the heuristic opponent. Reserved for claims.
    #[serde(default = "default_opponent_name")]
    opponent_name: String,

    /// Fixed seed for the opponent's random fallback.
    #[serde(default)]
    opponent_seed: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_grace_window_ms() -> u64 {
    30_000
}

fn default_opponent_think_ms() -> u64 {
    500
}

fn default_max_name_len() -> usize {
    20
}

fn default_opponent_name() -> String {
    "Computer".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            grace_window_ms: default_grace_window_ms(),
            opponent_think_ms: default_opponent_think_ms(),
            max_name_len: default_max_name_len(),
            opponent_name: default_opponent_name(),
            opponent_seed: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse, or
    /// holds invalid values.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if given, else [`DEFAULT_CONFIG_FILE`] if present, else
    /// the defaults.
    ///
    /// # Errors
    ///
    /// An explicitly given file must exist and parse.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Rejects values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero grace window, a zero name length, or
    /// an empty opponent name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grace_window_ms == 0 {
            return Err(ConfigError::new("grace_window_ms must be greater than zero"));
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::new("max_name_len must be greater than zero"));
        }
        if self.opponent_name.trim().is_empty() {
            return Err(ConfigError::new("opponent_name cannot be empty"));
        }
        Ok(())
    }

    /// Grace window as a duration.
    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }

    /// Opponent thinking delay as a duration.
    pub fn opponent_think(&self) -> Duration {
        Duration::from_millis(self.opponent_think_ms)
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
