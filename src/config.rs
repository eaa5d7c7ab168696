use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::ai::groq::DEFAULT_MODEL;
use crate::ai::speech::DEFAULT_VOICE_ID;
use crate::provider::Provider;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub backend_url: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub elevenlabs_api_key: Option<String>,
    pub voice_id: String,
    pub voice_enabled: bool,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Backend.as_str().to_string()),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            groq_api_key: None,
            groq_model: DEFAULT_MODEL.to_string(),
            elevenlabs_api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            voice_enabled: true,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env(&std::env::vars().collect());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Persist only the voice toggle, leaving the rest of the file as it was.
    pub fn save_voice_enabled(enabled: bool) -> Result<()> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path).unwrap_or_else(|_| Self::new());
        config.voice_enabled = enabled;
        config.save_to(&path)
    }

    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

        if let Some(url) = get("VOICECHAT_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(provider) = get("VOICECHAT_PROVIDER") {
            self.provider = Some(provider);
        }
        if let Some(key) = get("GROQ_API_KEY") {
            self.groq_api_key = Some(key);
        }
        if let Some(key) = get("ELEVENLABS_API_KEY") {
            self.elevenlabs_api_key = Some(key);
        }
        if let Some(voice) = get("ELEVENLABS_VOICE_ID") {
            self.voice_id = voice;
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Backend)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("voicechat"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
