/// Process-wide configuration
///
/// The API token is read from the environment exactly once, before any dataset
/// I/O. Everything else has a default and can be overridden from a JSON file.

use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding the bearer token for the narrative service
pub const TOKEN_ENV_VAR: &str = "AIPROXY_TOKEN";

pub const DEFAULT_ENDPOINT: &str = "https://aiproxy.sanand.workers.dev/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for the chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorSettings {
    /// Full URL of the chat-completions endpoint
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for NarratorSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NarratorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything the pipeline needs from the outside world
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub narrator: NarratorSettings,
}

impl Config {
    /// Build the configuration from the environment and an optional JSON file
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to a JSON file with narrator settings
    ///
    /// # Returns
    ///
    /// The configuration, or a `ConfigError` when the token is missing or the
    /// file cannot be used
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let api_token = read_token(std::env::var(TOKEN_ENV_VAR).ok())?;
        let narrator = match config_path {
            Some(path) => load_settings(path)?,
            None => NarratorSettings::default(),
        };

        Ok(Self { api_token, narrator })
    }
}

/// Validate the raw credential value taken from the environment
///
/// An empty or whitespace-only value counts as absent.
pub fn read_token(raw: Option<String>) -> Result<String, ConfigError> {
    match raw {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ConfigError::MissingToken { var: TOKEN_ENV_VAR }),
    }
}

/// Load narrator settings from a JSON file
///
/// Keys that are not present keep their defaults.
pub fn load_settings(path: &Path) -> Result<NarratorSettings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let settings: NarratorSettings =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    info!("Loaded configuration from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_an_error() {
        assert!(matches!(
            read_token(None),
            Err(ConfigError::MissingToken { var: TOKEN_ENV_VAR })
        ));
        assert!(read_token(Some("   ".to_string())).is_err());
        assert_eq!(read_token(Some(" abc \n".to_string())).unwrap(), "abc");
    }

    #[test]
    fn test_partial_settings_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": "gpt-4o", "unknown": 1}"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_settings(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            load_settings(&dir.path().join("absent.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
