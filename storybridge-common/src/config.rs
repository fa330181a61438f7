//! Configuration loading for storybridge
//!
//! Settings are resolved in priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! Credentials have no compiled default; a missing credential is a
//! configuration error naming the variable to set.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the TOML config file location
pub const ENV_CONFIG_PATH: &str = "STORYBRIDGE_CONFIG";
pub const ENV_SOURCE_API_KEY: &str = "STORYBRIDGE_SOURCE_API_KEY";
pub const ENV_SOURCE_BASE_ID: &str = "STORYBRIDGE_SOURCE_BASE_ID";
pub const ENV_SOURCE_API_URL: &str = "STORYBRIDGE_SOURCE_API_URL";
pub const ENV_DATABASE_URL: &str = "STORYBRIDGE_DATABASE_URL";
pub const ENV_LOG_DIR: &str = "STORYBRIDGE_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "STORYBRIDGE_LOG_LEVEL";
pub const ENV_LOCK_WAIT_MS: &str = "STORYBRIDGE_LOCK_WAIT_MS";

/// Default record store REST endpoint
pub const DEFAULT_SOURCE_API_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_LOG_DIR: &str = "./migration-logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOCK_WAIT_MS: u64 = 5000;

/// TOML config file contents. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub source: SourceSection,
    pub target: TargetSection,
    pub logging: LoggingConfig,
}

/// `[source]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub api_key: Option<String>,
    pub base_id: Option<String>,
    pub api_url: Option<String>,
}

/// `[target]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    pub database_url: Option<String>,
    pub lock_wait_ms: Option<u64>,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub directory: Option<PathBuf>,
}

/// Fully resolved settings for one migration run
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub source_api_key: String,
    pub source_base_id: String,
    pub source_api_url: String,
    pub database_url: String,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub lock_wait_ms: u64,
}

impl MigrationConfig {
    /// Resolve configuration from the environment and the default TOML file
    pub fn resolve() -> Result<Self> {
        let toml_config = match config_file_path() {
            Some(path) if path.exists() => load_toml_config(&path)?,
            Some(path) => {
                debug!("No config file at {}, using environment and defaults", path.display());
                TomlConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using environment and defaults");
                TomlConfig::default()
            }
        };

        Self::resolve_with(&toml_config)
    }

    /// Resolve configuration from the environment layered over `toml_config`
    pub fn resolve_with(toml_config: &TomlConfig) -> Result<Self> {
        let source_api_key = required(ENV_SOURCE_API_KEY, toml_config.source.api_key.as_deref(), "source.api_key")?;
        let source_base_id = required(ENV_SOURCE_BASE_ID, toml_config.source.base_id.as_deref(), "source.base_id")?;
        let database_url = required(ENV_DATABASE_URL, toml_config.target.database_url.as_deref(), "target.database_url")?;

        let source_api_url = env_value(ENV_SOURCE_API_URL)
            .or_else(|| non_blank(toml_config.source.api_url.as_deref()))
            .unwrap_or_else(|| DEFAULT_SOURCE_API_URL.to_string());

        let log_dir = env_value(ENV_LOG_DIR)
            .map(PathBuf::from)
            .or_else(|| toml_config.logging.directory.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        let log_level = env_value(ENV_LOG_LEVEL)
            .or_else(|| non_blank(toml_config.logging.level.as_deref()))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let lock_wait_ms = match env_value(ENV_LOCK_WAIT_MS) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("{} must be a whole number of milliseconds, got '{}'", ENV_LOCK_WAIT_MS, raw))
            })?,
            None => toml_config.target.lock_wait_ms.unwrap_or(DEFAULT_LOCK_WAIT_MS),
        };

        Ok(Self {
            source_api_key,
            source_base_id,
            source_api_url,
            database_url,
            log_dir,
            log_level,
            lock_wait_ms,
        })
    }
}

/// Location of the TOML config file
///
/// `STORYBRIDGE_CONFIG` wins; otherwise `{config_dir}/storybridge/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = env_value(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("storybridge").join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Environment variable value, treating blank values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| non_blank(Some(&v)))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(env_name: &str, toml_value: Option<&str>, toml_key: &str) -> Result<String> {
    env_value(env_name)
        .or_else(|| non_blank(toml_value))
        .ok_or_else(|| {
            Error::Config(format!(
                "{} is not configured. Set the {} environment variable or `{}` in the config file",
                toml_key, env_name, toml_key
            ))
        })
}
