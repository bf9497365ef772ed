//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the service URLs, the technician's department, and the
//! last used username.
//!
//! Configuration is stored at `~/.config/turnout-mobile/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "turnout-mobile";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL for the gear service data API.
const DEFAULT_API_BASE_URL: &str = "https://api.gearservice.app/v2";

/// Default base URL for the auth endpoints.
const DEFAULT_AUTH_BASE_URL: &str = "https://auth.gearservice.app";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub auth_base_url: String,
    pub department_id: Option<i64>,
    pub station_name: Option<String>,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            department_id: None,
            station_name: None,
            last_username: None,
        }
    }
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

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(department_id) = self.department_id {
            path = path.join(department_id.to_string());
        }
        Ok(path)
    }
}
