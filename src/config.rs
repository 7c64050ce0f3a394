use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TravelAgentError};
use crate::models::LocationCode;
use crate::vocabulary::Vocabulary;

/// Main configuration structure for flightchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAIConfig,
    pub anthropic: AnthropicConfig,
    pub amadeus: AmadeusConfig,
    pub search: SearchConfig,
    pub media: MediaConfig,
    pub vocabulary: Vocabulary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "flightchat".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Chat completions, images and audio. Without a key the assistant answers
/// with a local echo and the media tools are unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub chat_model: String,
    pub temperature: f32,
    pub image_model: String,
    pub transcription_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            image_model: "dall-e-3".to_string(),
            transcription_model: "whisper-1".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            tts_voice: "alloy".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl OpenAIConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 800,
            base_url: "https://api.anthropic.com".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl AnthropicConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmadeusEnv {
    #[default]
    Test,
    #[serde(alias = "prod")]
    Production,
}

impl AmadeusEnv {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "test" => Some(Self::Test),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Self::Test => "https://test.api.amadeus.com",
            Self::Production => "https://api.amadeus.com",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmadeusConfig {
    pub client_id: String,
    pub client_secret: String,
    pub env: AmadeusEnv,
    pub token_timeout_seconds: u64,
    pub search_timeout_seconds: u64,
    /// Refresh the token once less than this much validity is left
    pub token_refresh_margin_seconds: u64,
    pub max_results: u32,
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            env: AmadeusEnv::Test,
            token_timeout_seconds: 20,
            search_timeout_seconds: 30,
            token_refresh_margin_seconds: 60,
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_currency: String,
    /// Days from today used when the message names no date
    pub window_days: u32,
    pub fallback_origin: String,
    /// `None` disables the destination fallback
    pub fallback_destination: Option<String>,
    /// Offers listed in the summary handed to the generator
    pub summary_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
            window_days: 7,
            fallback_origin: "IST".to_string(),
            fallback_destination: Some("LON".to_string()),
            summary_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub image_dir: PathBuf,
    pub audio_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("generated_images"),
            audio_dir: PathBuf::from("generated_audio"),
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
    }
    parsed
}

fn is_currency_code(raw: &str) -> bool {
    raw.len() == 3 && raw.chars().all(|c| c.is_ascii_uppercase())
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    ///
    /// Fails when the file exists but cannot be parsed, or when the result
    /// does not validate (e.g. missing Amadeus credentials).
    pub fn load() -> Result<Self> {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }
        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("FLIGHTCHAT_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::from_file_or_default(Path::new(&config_path))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse `path` when it exists; a missing file means defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {} - using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config = serde_yaml::from_str::<Config>(&contents).map_err(|e| {
            TravelAgentError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; the process environment in production.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // OpenAI
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.openai.chat_model = model;
        }
        if let Some(model) = lookup("IMAGE_MODEL") {
            self.openai.image_model = model;
        }
        if let Some(model) = lookup("TTS_MODEL") {
            self.openai.tts_model = model;
        }
        if let Some(voice) = lookup("TTS_VOICE") {
            self.openai.tts_voice = voice;
        }

        // Anthropic
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = Some(key);
        }
        if let Some(model) = lookup("ANTHROPIC_MODEL") {
            self.anthropic.model = model;
        }

        // Amadeus
        if let Some(id) = lookup("AMADEUS_API_KEY") {
            self.amadeus.client_id = id;
        }
        if let Some(secret) = lookup("AMADEUS_API_SECRET") {
            self.amadeus.client_secret = secret;
        }
        if let Some(raw) = lookup("AMADEUS_ENV") {
            match AmadeusEnv::parse(&raw) {
                Some(env) => self.amadeus.env = env,
                None => tracing::warn!("Unknown AMADEUS_ENV '{}', keeping {:?}", raw, self.amadeus.env),
            }
        }

        // Search defaults
        if let Some(currency) = lookup("FLIGHTCHAT_DEFAULT_CURRENCY") {
            self.search.default_currency = currency.trim().to_uppercase();
        }
        if let Some(raw) = lookup("FLIGHTCHAT_SEARCH_WINDOW_DAYS") {
            if let Some(days) = parse_or_warn("FLIGHTCHAT_SEARCH_WINDOW_DAYS", &raw) {
                self.search.window_days = days;
            }
        }
        if let Some(origin) = lookup("FLIGHTCHAT_FALLBACK_ORIGIN") {
            self.search.fallback_origin = origin;
        }
        if let Some(destination) = lookup("FLIGHTCHAT_FALLBACK_DESTINATION") {
            let trimmed = destination.trim();
            self.search.fallback_destination =
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(trimmed.to_string())
                };
        }

        // Media
        if let Some(dir) = lookup("FLIGHTCHAT_IMAGE_DIR") {
            self.media.image_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("FLIGHTCHAT_AUDIO_DIR") {
            self.media.audio_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.amadeus.client_id.trim().is_empty() || self.amadeus.client_secret.trim().is_empty() {
            return Err(TravelAgentError::Config(
                "Amadeus credentials are missing. Set AMADEUS_API_KEY/AMADEUS_API_SECRET".into(),
            ));
        }
        if !(1..=250).contains(&self.amadeus.max_results) {
            return Err(TravelAgentError::Config(
                "amadeus.max_results must be between 1 and 250".into(),
            ));
        }
        if !is_currency_code(&self.search.default_currency) {
            return Err(TravelAgentError::Config(format!(
                "search.default_currency '{}' is not a three-letter code",
                self.search.default_currency
            )));
        }
        if LocationCode::parse(&self.search.fallback_origin).is_none() {
            return Err(TravelAgentError::Config(format!(
                "search.fallback_origin '{}' is not a location code",
                self.search.fallback_origin
            )));
        }
        if let Some(destination) = &self.search.fallback_destination {
            if LocationCode::parse(destination).is_none() {
                return Err(TravelAgentError::Config(format!(
                    "search.fallback_destination '{destination}' is not a location code"
                )));
            }
        }
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(TravelAgentError::Config(
                "openai.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        self.vocabulary.validate().map_err(TravelAgentError::Config)?;

        if self.openai.api_key().is_none() {
            tracing::warn!("OPENAI_API_KEY not set - replies will use the local echo generator");
        }
        if self.anthropic.api_key().is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set - translations will use the local echo translator");
        }
        Ok(())
    }
}
