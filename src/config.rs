//! Zodiac Project Configuration
//!
//! Handles parsing and management of zodiac.toml configuration files.

use crate::logger::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name of the configuration file searched for by `find_and_load`.
pub const CONFIG_FILE_NAME: &str = "zodiac.toml";

/// Directory entry marking a repository root; the config search stops there.
const REPOSITORY_MARKER: &str = ".git";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid log level in config: {0}")]
    InvalidLevel(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching zodiac.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ZodiacConfig {
    /// Runtime logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Disassembly output
    #[serde(default)]
    pub disasm: DisasmConfig,

    /// Stream reading limits
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl ZodiacConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration text and validate it.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: ZodiacConfig = toml::from_str(content)?;
        config.logging.level()?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// The search ends at the enclosing repository root (a directory holding
    /// `.git`), so a `zodiac.toml` outside the project is never picked up.
    /// Without a config file the defaults apply.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        for dir in start_dir.ancestors() {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Self::load(&config_path);
            }
            if dir.join(REPOSITORY_MARKER).exists() {
                break;
            }
        }
        Ok(Self::default())
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Runtime logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Minimum level (debug, info, notice, warning, error, critical, alert, emergency)
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level(&self) -> ConfigResult<LogLevel> {
        self.level
            .parse()
            .map_err(|_| ConfigError::InvalidLevel(self.level.clone()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Disassembly output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisasmConfig {
    /// Prefix each line with the record's stream offset
    #[serde(default = "default_true")]
    pub show_offsets: bool,

    /// Show raw header bytes
    #[serde(default)]
    pub show_bytes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisasmConfig {
    fn default() -> Self {
        Self {
            show_offsets: true,
            show_bytes: false,
        }
    }
}

/// Stream reading settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReaderConfig {
    /// Maximum instructions processed per command (0 = unlimited)
    #[serde(default)]
    pub max_instructions: usize,
}

impl ReaderConfig {
    pub fn limit(&self) -> Option<usize> {
        match self.max_instructions {
            0 => None,
            n => Some(n),
        }
    }
}
