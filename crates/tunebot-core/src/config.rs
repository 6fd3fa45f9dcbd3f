use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::assistant::AssistantSettings;
use crate::extractor::TieBreak;
use crate::provider::Provider;
use crate::recognizer::RecognizerConfig;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f64>,
    pub openai_api_key: Option<String>,
    /// Overrides the provider's chat-completions endpoint
    pub base_url: Option<String>,
    pub music_dir: Option<PathBuf>,
    /// e.g. "mpv --no-video"; the track path is appended
    pub player_command: Option<String>,
    pub max_history: Option<usize>,
    pub exact_match_first: bool,
    pub recognizer: RecognizerConfig,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some("openai".to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::OpenAI)
    }

    /// Environment first, then the config file
    pub fn api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.openai_api_key.clone())
    }

    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider().default_endpoint().to_string())
    }

    pub fn music_dir(&self) -> PathBuf {
        self.music_dir
            .clone()
            .or_else(dirs::audio_dir)
            .unwrap_or_else(|| PathBuf::from("music"))
    }

    pub fn assistant_settings(&self) -> AssistantSettings {
        let provider = self.provider();
        let defaults = AssistantSettings::default();
        AssistantSettings {
            model: self
                .default_model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_history: self.max_history,
            tie_break: if self.exact_match_first {
                TieBreak::ExactFirst
            } else {
                TieBreak::FirstInCatalog
            },
            ..defaults
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("tunebot").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.provider(), Provider::OpenAI);
        let settings = config.assistant_settings();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.max_history, None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.provider = Some("ollama".to_string());
        config.default_model = Some("qwen2.5".to_string());
        config.max_history = Some(20);
        config.exact_match_first = true;
        config.recognizer.host = "identify.example.com".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.provider(), Provider::Ollama);
        assert_eq!(loaded.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(loaded.recognizer.host, "identify.example.com");
        assert_eq!(loaded.recognizer.sample_rate, 44100);

        let settings = loaded.assistant_settings();
        assert_eq!(settings.model, "qwen2.5");
        assert_eq!(settings.max_history, Some(20));
        assert_eq!(settings.tie_break, TieBreak::ExactFirst);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url":"http://proxy/v1/chat/completions"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.endpoint(), "http://proxy/v1/chat/completions");
        assert_eq!(config.recognizer.channels, 1);
    }
}
