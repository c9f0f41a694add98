//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\phonodex\config.toml
//! - macOS: ~/Library/Application Support/phonodex/config.toml
//! - Linux: ~/.config/phonodex/config.toml
//!
//! The config file is human-readable and editable. Every value has a
//! default, so a missing or partial file always yields a usable config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::enrichment::EnrichmentConfig;
use crate::export::DEFAULT_LAYOUT;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Enrichment lookup settings
    pub enrichment: LookupConfig,

    /// Folder-layout export settings
    pub export: ExportConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Discogs personal access token for catalog lookups
    pub discogs_token: Option<String>,
}

/// Enrichment lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Max lookup calls per rolling window (Discogs allows 60)
    pub rate_ceiling: u32,

    /// Rolling rate window, in seconds
    pub rate_window_secs: u64,

    /// Per-request network timeout, in seconds
    pub timeout_secs: u64,

    /// Worker pool size for batch runs
    pub concurrency: usize,

    /// Prefer the oldest catalogued pressing over the provider's best match
    pub prefer_oldest_release: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            rate_ceiling: 60,
            rate_window_secs: 60,
            timeout_secs: 10,
            concurrency: 4,
            prefer_oldest_release: false,
        }
    }
}

/// Folder-layout export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Destination root for exported files
    pub destination: Option<PathBuf>,

    /// Layout string with %field% placeholders
    pub layout: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            destination: None,
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}

impl Config {
    /// Build the enrichment service configuration, with the token from
    /// the CLI/env taking precedence over the config file.
    pub fn enrichment_config(&self, token_override: Option<&str>) -> EnrichmentConfig {
        let token = token_override
            .map(str::to_string)
            .or_else(|| self.credentials.discogs_token.clone())
            .unwrap_or_default();
        EnrichmentConfig {
            token,
            rate_ceiling: self.enrichment.rate_ceiling,
            rate_window: Duration::from_secs(self.enrichment.rate_window_secs),
            timeout: Duration::from_secs(self.enrichment.timeout_secs),
            concurrency: self.enrichment.concurrency,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("phonodex"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[credentials]"));
        assert!(toml.contains("[enrichment]"));
        assert!(toml.contains("[export]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.credentials.discogs_token = Some("test-token-123".to_string());
        config.enrichment.concurrency = 8;
        config.export.destination = Some(PathBuf::from("/music/sorted"));

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(
            parsed.credentials.discogs_token,
            Some("test-token-123".to_string())
        );
        assert_eq!(parsed.enrichment.concurrency, 8);
        assert_eq!(parsed.export.destination, Some(PathBuf::from("/music/sorted")));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[credentials]
discogs_token = "my-token"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.credentials.discogs_token, Some("my-token".to_string()));

        // Other fields use defaults
        assert_eq!(config.enrichment.rate_ceiling, 60);
        assert_eq!(config.enrichment.rate_window_secs, 60);
        assert_eq!(config.export.layout, DEFAULT_LAYOUT);
    }

    #[test]
    fn test_token_override_wins() {
        let mut config = Config::default();
        config.credentials.discogs_token = Some("file-token".to_string());

        let ec = config.enrichment_config(Some("flag-token"));
        assert_eq!(ec.token, "flag-token");

        let ec = config.enrichment_config(None);
        assert_eq!(ec.token, "file-token");
    }
}
