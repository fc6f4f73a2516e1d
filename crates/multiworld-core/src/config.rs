//! Configuration loading and typed config structures for multiworld sessions.
//!
//! The canonical configuration lives in `multiworld.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, and
//! provides a loader that reads the file and applies environment overrides.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `multiworld.yaml`. Every field has a default, so
/// an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MultiworldConfig {
    /// Seed generation settings.
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Sync loop settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Per-session game options.
    #[serde(default)]
    pub session: SessionConfig,

    /// Relay connection settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Players and seed for a locally hosted game.
    #[serde(default)]
    pub game: GameConfig,
}

impl MultiworldConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `MULTIWORLD_RELAY_URL` overrides `relay.url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.relay.apply_env_overrides();
        Ok(config)
    }
}

/// Seed generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerationSettings {
    /// Attempts before generation gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Sync loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Seconds between outbound state pushes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Per-session game options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Deliver outstanding items when a player completes their game.
    #[serde(default = "default_true")]
    pub send_items_on_complete: bool,

    /// Propagate deaths between players.
    #[serde(default)]
    pub death_link: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_items_on_complete: true,
            death_link: false,
        }
    }
}

/// Relay connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Relay endpoint.
    #[serde(default = "default_relay_url")]
    pub url: String,
}

impl RelayConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MULTIWORLD_RELAY_URL") {
            self.url = val;
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Plain,
        }
    }
}

/// Players and seed for a locally hosted game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Seed string handed to the placement solver.
    #[serde(default = "default_seed")]
    pub seed: String,

    /// Players in join order. The first player is the admin.
    #[serde(default)]
    pub players: Vec<PlayerConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            players: Vec::new(),
        }
    }
}

/// One player entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerConfig {
    /// Display name.
    pub name: String,

    /// Pronunciation hint, defaults to the name.
    #[serde(default)]
    pub phonetic_name: Option<String>,

    /// Opaque solver settings.
    #[serde(default)]
    pub settings: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_max_attempts() -> u32 {
    3
}

const fn default_interval_secs() -> u64 {
    60
}

const fn default_true() -> bool {
    true
}

fn default_relay_url() -> String {
    "ws://localhost:5000/multiplayer".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_seed() -> String {
    "multiworld".to_owned()
}
