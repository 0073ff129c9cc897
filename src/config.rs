use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub default_model: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Environment variable wins over the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini_api_key.clone())
    }

    pub fn resolve_model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("kwminer").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_falls_back() {
        let config = Config::default();
        assert_eq!(config.resolve_model(), DEFAULT_MODEL);

        let config = Config {
            default_model: Some("gemini-2.0-pro".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_model(), "gemini-2.0-pro");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config {
            gemini_api_key: Some("k".to_string()),
            default_model: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gemini_api_key.as_deref(), Some("k"));
        assert!(back.default_model.is_none());
    }
}
