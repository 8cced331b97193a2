use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub auth_url: String,
    pub auth_key: String,
    pub gemini_api_key: String,
    pub default_model: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            // Local Supabase stack default; point at the hosted project URL
            // in the config file for real use.
            auth_url: "http://127.0.0.1:54321".to_string(),
            auth_key: String::new(),
            gemini_api_key: String::new(),
            default_model: None,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to_path(&config_path)
    }

    /// Environment variables take precedence over the config file.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CHARLA_AUTH_URL") {
            self.auth_url = url;
        }
        if let Ok(key) = std::env::var("CHARLA_AUTH_KEY") {
            self.auth_key = key;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = key;
        }
        if let Ok(model) = std::env::var("CHARLA_MODEL") {
            self.default_model = Some(model);
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("charla").join("config.json"))
    }

    /// Where diagnostics go. The terminal is owned by the TUI, so logging
    /// writes to a file next to the config.
    pub fn log_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("charla").join("charla.log"))
    }
}
