use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::validate::MAX_IDENTITIES;

/// Main configuration structure
///
/// Loaded from the config file with CLI args layered on top.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults if
    /// no file exists yet
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("Could not find config directory".into()))?
            .join("gitpulse");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub personal access token
    /// Get one at https://github.com/settings/tokens
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Milliseconds to wait between consecutive page requests
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Ceiling on identities per request
    #[serde(default = "default_max_identities")]
    pub max_identities: usize,
}

fn default_page_delay_ms() -> u64 {
    gitpulse_api::github::DEFAULT_PAGE_DELAY_MS
}

fn default_max_identities() -> usize {
    MAX_IDENTITIES
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            max_identities: default_max_identities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fetch.page_delay_ms, 750);
        assert_eq!(config.fetch.max_identities, 15);
        assert!(config.github.token.is_none());
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("page_delay_ms"));
        assert!(toml.contains("max_identities"));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("[github]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.fetch.page_delay_ms, 750);
    }
}
