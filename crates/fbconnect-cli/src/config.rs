//! Application configuration management.
//!
//! This module handles loading and saving the CLI configuration: the
//! application credentials, which session store to use, the storage key and
//! endpoint overrides.
//!
//! Configuration is stored at `~/.config/fbconnect/config.json`. The
//! `FB_API_KEY`, `FB_APP_SECRET` and `FB_STORE` environment variables take
//! precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fbconnect_core::ClientConfig;
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "fbconnect";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Storage key used when the config names none
pub const DEFAULT_STORAGE_KEY: &str = "default";

/// Where persisted sessions live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "file" => Some(StoreBackend::File),
            "keyring" | "keychain" => Some(StoreBackend::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub app_secret: Option<String>,
    pub storage_key: Option<String>,
    pub store: StoreBackend,
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Read a config file, falling back to defaults when it does not exist
    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(key) = non_empty("FB_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(secret) = non_empty("FB_APP_SECRET") {
            self.app_secret = Some(secret);
        }
        if let Some(store) = non_empty("FB_STORE").and_then(|v| StoreBackend::parse(&v)) {
            self.store = store;
        }
    }

    /// Application key and secret, both required to talk to the API
    pub fn app_credentials(&self) -> Result<(String, String)> {
        match (&self.api_key, &self.app_secret) {
            (Some(key), Some(secret)) => Ok((key.clone(), secret.clone())),
            _ => Err(anyhow::anyhow!(
                "No application credentials. Set FB_API_KEY and FB_APP_SECRET or add them to {}",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| CONFIG_FILE.to_string())
            )),
        }
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key.as_deref().unwrap_or(DEFAULT_STORAGE_KEY)
    }
}
