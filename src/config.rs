//! Application configuration management.
//!
//! Configuration is stored at `~/.config/fxterm/config.json` and holds the
//! API base URL override and the last signed-in email (prefilled at the
//! login prompt). `FXTERM_BASE_URL` overrides the configured base URL.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;

/// Application name used for config/data directory paths
const APP_NAME: &str = "fxterm";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment override for the API base URL
const BASE_URL_ENV: &str = "FXTERM_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Base URL resolution order: environment, config file, default
    pub fn resolved_base_url(&self) -> String {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                return url;
            }
        }
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_base_url_defaults() {
        std::env::remove_var(BASE_URL_ENV);
        let config = Config::default();
        assert_eq!(config.resolved_base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_resolved_base_url_prefers_config_value() {
        std::env::remove_var(BASE_URL_ENV);
        let config = Config {
            base_url: Some("http://10.0.0.5:8000".to_string()),
            last_email: None,
        };
        assert_eq!(config.resolved_base_url(), "http://10.0.0.5:8000");
    }
}
