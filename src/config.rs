//! Configuration loading and management for comicbot.
//!
//! Loads settings from `comicbot.toml` with environment variable overrides
//! for secrets and per-site identifiers.

use crate::comic::ComicSource;
use crate::search::SearchEngine;
use crate::schedule::DailySchedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const CONFIG_FILE: &str = "comicbot.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Vision models available for comic explanations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageModel {
    #[default]
    #[serde(rename = "llama-4-scout")]
    Llama4Scout,
    #[serde(rename = "llama-4-maverick")]
    Llama4Maverick,
}

impl ImageModel {
    /// Model identifier sent to the API
    pub fn model_id(self) -> &'static str {
        match self {
            ImageModel::Llama4Scout => "meta-llama/llama-4-scout-17b-16e-instruct",
            ImageModel::Llama4Maverick => "meta-llama/llama-4-maverick-17b-128e-instruct",
        }
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageModel::Llama4Scout => f.write_str("llama-4-scout"),
            ImageModel::Llama4Maverick => f.write_str("llama-4-maverick"),
        }
    }
}

impl FromStr for ImageModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "llama-4-scout" | "meta-llama/llama-4-scout-17b-16e-instruct" => {
                Ok(ImageModel::Llama4Scout)
            }
            "llama-4-maverick" | "meta-llama/llama-4-maverick-17b-128e-instruct" => {
                Ok(ImageModel::Llama4Maverick)
            }
            other => Err(ConfigError::InvalidValue {
                key: "image model",
                value: other.to_string(),
            }),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Vision model used to explain comics
    pub model: ImageModel,
    /// Extra attempts after a failed request
    pub max_retries: u32,
    /// Per-request timeout; unbounded when absent
    pub timeout_secs: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: ImageModel::default(),
            max_retries: 2,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: SearchEngine,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub groq_key: Option<String>,
    #[serde(default)]
    pub google_key: Option<String>,
}

/// Per-site identifiers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// Google custom search engine id
    #[serde(default)]
    pub cse_id: Option<String>,
    /// Chat webhook receiving the daily post
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub xkcd: SourceConfig,
    pub turnoff_us: SourceConfig,
    pub monkeyuser: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, source: ComicSource) -> &SourceConfig {
        match source {
            ComicSource::Xkcd => &self.xkcd,
            ComicSource::TurnoffUs => &self.turnoff_us,
            ComicSource::MonkeyUser => &self.monkeyuser,
        }
    }

    fn get_mut(&mut self, source: ComicSource) -> &mut SourceConfig {
        match source {
            ComicSource::Xkcd => &mut self.xkcd,
            ComicSource::TurnoffUs => &mut self.turnoff_us,
            ComicSource::MonkeyUser => &mut self.monkeyuser,
        }
    }
}

/// The settings that can change while the bot is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub search_engine: SearchEngine,
    pub image_model: ImageModel,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub schedule: DailySchedule,
}

impl Config {
    /// Load configuration from the default location (comicbot.toml in cwd or home).
    ///
    /// Falls back to defaults plus environment overrides when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Self::from_env(Config::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Self::from_env(config)
    }

    /// Apply environment variable overrides
    fn from_env(config: Config) -> Result<Self, ConfigError> {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides(
        mut config: Config,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(key) = var("GROQ_API_KEY") {
            config.api.groq_key = Some(key);
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            config.api.google_key = Some(key);
        }
        if let Some(engine) = var("SEARCH_ENGINE") {
            config.search.engine = engine.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SEARCH_ENGINE",
                value: engine.clone(),
            })?;
        }
        if let Some(model) = var("IMAGE_LLM") {
            config.agent.model = model.parse()?;
        }

        for source in ComicSource::ALL {
            let prefix = env_prefix(source);
            let entry = config.sources.get_mut(source);
            if let Some(id) = var(&format!("{prefix}_CSE_ID")) {
                entry.cse_id = Some(id);
            }
            if let Some(url) = var(&format!("{prefix}_WEBHOOK_URL")) {
                entry.webhook_url = Some(url);
            }
        }

        Ok(config)
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        dirs::home_dir()
            .map(|home| home.join(".config").join("comicbot").join(CONFIG_FILE))
            .filter(|path| path.exists())
    }

    /// Current runtime settings
    pub fn settings(&self) -> Settings {
        Settings {
            search_engine: self.search.engine,
            image_model: self.agent.model,
        }
    }

    pub fn set_search_engine(&mut self, engine: SearchEngine) {
        self.search.engine = engine;
    }

    pub fn set_image_model(&mut self, model: ImageModel) {
        self.agent.model = model;
    }
}

fn env_prefix(source: ComicSource) -> &'static str {
    match source {
        ComicSource::Xkcd => "XKCD",
        ComicSource::TurnoffUs => "TURNOFFUS",
        ComicSource::MonkeyUser => "MONKEYUSER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_the_hosted_setup() {
        let config = Config::default();
        assert_eq!(
            config.settings(),
            Settings {
                search_engine: SearchEngine::DuckDuckGo,
                image_model: ImageModel::Llama4Scout,
            }
        );
        assert_eq!(config.agent.max_retries, 2);
        assert!(config.agent.timeout_secs.is_none());
    }

    #[test]
    fn loads_a_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[agent]
model = "llama-4-maverick"
timeout_secs = 60

[search]
engine = "google"

[sources.xkcd]
cse_id = "abc123"
webhook_url = "https://discord.com/api/webhooks/1/xyz"

[schedule]
hour = 9
minute = 30
utc_offset_hours = 0
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.agent.model, ImageModel::Llama4Maverick);
        assert_eq!(config.agent.timeout_secs, Some(60));
        assert_eq!(config.search.engine, SearchEngine::Google);
        assert_eq!(config.sources.get(ComicSource::Xkcd).cse_id.as_deref(), Some("abc123"));
        assert!(config.sources.get(ComicSource::MonkeyUser).webhook_url.is_none());
        assert_eq!(config.schedule.hour, 9);
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GROQ_API_KEY", "gsk_test"),
            ("SEARCH_ENGINE", "google"),
            ("IMAGE_LLM", "meta-llama/llama-4-maverick-17b-128e-instruct"),
            ("TURNOFFUS_CSE_ID", "turnoff-cse"),
            ("MONKEYUSER_WEBHOOK_URL", "https://hooks.example/monkey"),
        ]);
        let config = Config::apply_overrides(Config::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.api.groq_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.search.engine, SearchEngine::Google);
        assert_eq!(config.agent.model, ImageModel::Llama4Maverick);
        assert_eq!(
            config.sources.get(ComicSource::TurnoffUs).cse_id.as_deref(),
            Some("turnoff-cse")
        );
        assert_eq!(
            config.sources.get(ComicSource::MonkeyUser).webhook_url.as_deref(),
            Some("https://hooks.example/monkey")
        );
    }

    #[test]
    fn invalid_engine_is_rejected() {
        let result = Config::apply_overrides(Config::default(), |key| {
            (key == "SEARCH_ENGINE").then(|| "altavista".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "SEARCH_ENGINE", .. })
        ));
    }

    #[test]
    fn settings_can_be_changed() {
        let mut config = Config::default();
        config.set_search_engine(SearchEngine::Google);
        config.set_image_model(ImageModel::Llama4Maverick);
        assert_eq!(config.settings().search_engine, SearchEngine::Google);
        assert_eq!(config.settings().image_model, ImageModel::Llama4Maverick);
    }
}
