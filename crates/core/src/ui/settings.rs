//! User settings persistence.
//!
//! Stored as JSON in the user's config directory
//! (e.g. `~/.config/homework-helper/settings.json` on Linux).

use crate::config::{Config, DEFAULT_TEMPERATURE};
use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Gemini models offered in the settings panel.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-flash-latest",
    "gemini-flash-lite-latest",
];

/// User-configurable settings persisted between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Selected Gemini model name.
    pub model: String,
    /// API key override (takes precedence over environment).
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Monitor used by "Capture screen".
    #[serde(default)]
    pub monitor: usize,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "homework-helper").map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from disk, seeded from `config` when absent.
    pub fn load(config: &Config) -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(&path))
            .unwrap_or_else(|| Self::from_config(config))
    }

    fn load_from(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("ignoring unreadable settings at {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model_name.clone(),
            api_key: config.gemini_api_key.clone(),
            temperature: config.temperature,
            monitor: 0,
        }
    }

    /// Persists settings to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings as a request config, falling back to `base` for a blank key.
    pub fn to_config(&self, base: &Config) -> Result<Config> {
        let api_key = if self.api_key.trim().is_empty() {
            base.gemini_api_key.clone()
        } else {
            self.api_key.clone()
        };
        Config::builder()
            .with_api_key(api_key)
            .with_model(&self.model)
            .with_temperature(self.temperature)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config::builder().with_api_key("env-key").build().unwrap()
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::from_config(&base());
        settings.model = "gemini-2.5-pro".into();
        settings.monitor = 1;
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path), Some(settings));
    }

    #[test]
    fn old_files_get_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"model":"gemini-flash-latest"}"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.temperature, 0.4);
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn blank_key_falls_back_to_environment() {
        let mut settings = Settings::from_config(&base());
        settings.api_key.clear();
        let config = settings.to_config(&base()).unwrap();
        assert_eq!(config.gemini_api_key, "env-key");
    }
}
