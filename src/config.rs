use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{GeminiConfig, DEFAULT_BASE_URL};
use crate::asset::{PollPolicy, DEFAULT_MAX_POLL_ATTEMPTS};
use crate::error::{Result, TubeMagicError};
use crate::project::DEFAULT_HISTORY_LIMIT;

const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub chat_model: String,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub history_limit: usize,
    pub request_timeout_secs: u64,
    /// History and media live here; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            text_model: "gemini-3-pro-preview".into(),
            image_model: "gemini-3-pro-image-preview".into(),
            video_model: "veo-3.1-fast-generate-preview".into(),
            chat_model: "gemini-3-pro-preview".into(),
            poll_interval_secs: 5,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            request_timeout_secs: 300,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| TubeMagicError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("tubemagic").join("config.json"))
    }

    /// Environment first, then the stored key.
    pub fn get_api_key(&self) -> Option<String> {
        API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("tubemagic"))
            .ok_or_else(|| TubeMagicError::Config("data directory not found".into()))
    }

    pub fn media_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("media"))
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts.max(1),
        }
    }

    pub fn gemini(&self, api_key: String) -> GeminiConfig {
        GeminiConfig {
            api_key,
            base_url: self.base_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            video_model: self.video_model.clone(),
            chat_model: self.chat_model.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
