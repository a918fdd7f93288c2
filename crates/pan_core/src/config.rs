use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PanConfig {
    pub assistant: AssistantConfig,
    pub database: DatabaseConfig,
    pub conversation: ConversationConfig,
    pub mood: MoodConfig,
    pub affinity: AffinityConfig,
    pub idle: IdleConfig,
    pub capabilities: CapabilityConfig,
    pub weather: WeatherConfig,
    pub news: NewsConfig,
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
}

impl PanConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// A section that fails to deserialize or validate is reset to its
    /// defaults on its own; the rest of the file is kept.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config = Self::parse_lenient(&content)?;
        config.apply_env_overrides();
        config.sanitize();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or is not TOML at all,
    /// return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Config file {} unusable ({:#}), using defaults", path.display(), e);
                } else {
                    tracing::info!("No config file at {}, using defaults", path.display());
                }
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg.sanitize();
                cfg
            }
        }
    }

    /// Parse TOML one section at a time. Only a syntax error fails the whole
    /// document.
    pub fn parse_lenient(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().context("Failed to parse TOML config")?;
        Ok(Self {
            assistant: section(&table, "assistant"),
            database: section(&table, "database"),
            conversation: section(&table, "conversation"),
            mood: section(&table, "mood"),
            affinity: section(&table, "affinity"),
            idle: section(&table, "idle"),
            capabilities: section(&table, "capabilities"),
            weather: section(&table, "weather"),
            news: section(&table, "news"),
            search: section(&table, "search"),
            llm: section(&table, "llm"),
            voice: section(&table, "voice"),
        })
    }

    /// Apply environment variable overrides on top of file-based config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            self.database.path = v;
        }
        if let Ok(v) = std::env::var("WEATHER_API_KEY") {
            self.weather.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("NEWS_API_KEY") {
            self.news.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DEFAULT_CITY") {
            self.weather.default_city = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_COUNTRY_CODE") {
            self.weather.default_country_code = v;
        }
        if let Ok(v) = std::env::var("MAX_SHORT_TERM_MEMORY") {
            if let Ok(n) = v.parse() {
                self.conversation.short_term_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("IDLE_THRESHOLD_SECONDS") {
            if let Ok(n) = v.parse() {
                self.idle.threshold_secs = n;
            }
        }
        if let Ok(v) = std::env::var("MIN_SPEECH_INTERVAL_SECONDS") {
            if let Ok(n) = v.parse() {
                self.idle.min_unprompted_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("ASSISTANT_NAME") {
            self.assistant.name = v;
        }
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
    }

    /// Reject settings the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.conversation.validate()?;
        self.affinity.validate()?;
        self.mood.validate()?;
        self.idle.validate()?;
        self.capabilities.validate()
    }

    /// Reset every section that fails validation to its defaults. Returns
    /// what was rejected.
    pub fn sanitize(&mut self) -> Vec<ConfigError> {
        let mut rejected = Vec::new();
        reset_if_invalid(&mut self.conversation, ConversationConfig::validate, &mut rejected);
        reset_if_invalid(&mut self.affinity, AffinityConfig::validate, &mut rejected);
        reset_if_invalid(&mut self.mood, MoodConfig::validate, &mut rejected);
        reset_if_invalid(&mut self.idle, IdleConfig::validate, &mut rejected);
        reset_if_invalid(&mut self.capabilities, CapabilityConfig::validate, &mut rejected);
        rejected
    }
}

fn section<T: DeserializeOwned + Default>(table: &toml::Table, key: &str) -> T {
    let Some(value) = table.get(key) else {
        return T::default();
    };
    match value.clone().try_into() {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Config section [{}] rejected ({}), using its defaults", key, e);
            T::default()
        }
    }
}

fn reset_if_invalid<T: Default>(
    section: &mut T,
    check: fn(&T) -> Result<(), ConfigError>,
    rejected: &mut Vec<ConfigError>,
) {
    if let Err(e) = check(section) {
        tracing::warn!("{}; resetting the section to defaults", e);
        *section = T::default();
        rejected.push(e);
    }
}

impl ConversationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.short_term_capacity == 0 {
            return Err(ConfigError::Invalid(
                "conversation.short_term_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl AffinityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::Invalid(format!(
                "affinity.min ({}) exceeds affinity.max ({})",
                self.min, self.max
            )));
        }
        if !(self.min..=self.max).contains(&self.initial) {
            return Err(ConfigError::Invalid(format!(
                "affinity.initial ({}) outside [{}, {}]",
                self.initial, self.min, self.max
            )));
        }
        if self.warm_delta < 0 || self.hostile_delta < 0 {
            return Err(ConfigError::Invalid(
                "affinity deltas are magnitudes and must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl MoodConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_intensity > self.max_intensity {
            return Err(ConfigError::Invalid(
                "mood.min_intensity exceeds mood.max_intensity".into(),
            ));
        }
        if !(self.min_intensity..=self.max_intensity).contains(&self.baseline_intensity) {
            return Err(ConfigError::Invalid(
                "mood.baseline_intensity outside intensity bounds".into(),
            ));
        }
        if self.decay_per_sec < 0.0 {
            return Err(ConfigError::Invalid("mood.decay_per_sec must not be negative".into()));
        }
        Ok(())
    }
}

impl IdleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("idle.poll_interval_secs must be at least 1".into()));
        }
        Ok(())
    }
}

impl CapabilityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "capabilities.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub name: String,
    /// User assumed when nobody has introduced themselves.
    pub default_user: String,
    /// Keep the last asserted speaker active until another name is asserted.
    pub sticky_speaker: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Pan".to_string(),
            default_user: "friend".to_string(),
            sticky_speaker: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "pan_memory.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Exchanges kept in the short-term buffer.
    pub short_term_capacity: usize,
    /// Long-term memories pulled into a prompt.
    pub long_term_limit: usize,
    pub news_limit: usize,
    /// Opinions inserted at start-up when absent.
    pub seed_opinions: Vec<SeedOpinion>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 10,
            long_term_limit: 3,
            news_limit: 5,
            seed_opinions: default_seed_opinions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedOpinion {
    pub topic: String,
    pub stance: String,
}

fn default_seed_opinions() -> Vec<SeedOpinion> {
    [
        ("AI", "I think AI has great potential but needs ethical guidelines."),
        ("climate change", "Climate change is a serious issue that requires global cooperation."),
        ("space exploration", "Space exploration is fascinating and pushes humanity forward."),
    ]
    .into_iter()
    .map(|(topic, stance)| SeedOpinion {
        topic: topic.to_string(),
        stance: stance.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub min_intensity: f32,
    pub max_intensity: f32,
    /// Initial intensity and the point decay returns to.
    pub baseline_intensity: f32,
    /// Below this intensity the label is always neutral.
    pub active_threshold: f32,
    /// Above this intensity negative valence reads as annoyed rather than sad.
    pub annoyed_threshold: f32,
    /// |valence| needed for happy or sad.
    pub valence_threshold: f32,
    /// Fraction of the gap to the event polarity closed per event.
    pub valence_step: f32,
    pub sentiment_delta: f32,
    pub inquisitive_delta: f32,
    /// Intensity change per affinity point.
    pub affinity_gain: f32,
    /// Fraction of the distance to baseline removed per second.
    pub decay_per_sec: f32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            min_intensity: 0.0,
            max_intensity: 1.0,
            baseline_intensity: 0.5,
            active_threshold: 0.55,
            annoyed_threshold: 0.8,
            valence_threshold: 0.25,
            valence_step: 0.5,
            sentiment_delta: 0.15,
            inquisitive_delta: 0.1,
            affinity_gain: 0.02,
            decay_per_sec: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AffinityConfig {
    pub min: i64,
    pub max: i64,
    pub initial: i64,
    pub warm_delta: i64,
    pub hostile_delta: i64,
    /// Users above this score count as favorites.
    pub favorite_threshold: i64,
    /// Users at or below this score get a candid trust warning.
    pub low_trust_threshold: i64,
    /// Minimum score for the warm comfort response.
    pub comfort_threshold: i64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            min: -100,
            max: 100,
            initial: 0,
            warm_delta: 2,
            hostile_delta: 5,
            favorite_threshold: 50,
            low_trust_threshold: -20,
            comfort_threshold: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    pub enabled: bool,
    pub threshold_secs: u64,
    pub min_unprompted_interval_secs: u64,
    pub poll_interval_secs: u64,
    pub interests: Vec<String>,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_secs: 300,
            min_unprompted_interval_secs: 15,
            poll_interval_secs: 5,
            interests: ["space", "history", "technology", "science"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Upper bound on any single external call.
    pub timeout_secs: u64,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_city: String,
    pub default_country_code: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
            default_city: "Kelso".to_string(),
            default_country_code: "US".to_string(),
        }
    }
}

impl WeatherConfig {
    pub fn default_location(&self) -> String {
        if self.default_country_code.is_empty() {
            self.default_city.clone()
        } else {
            format!("{},{}", self.default_city, self.default_country_code)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsSourceKind {
    #[default]
    NewsApi,
    Rss,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub source: NewsSourceKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub country: String,
    pub rss_url: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            source: NewsSourceKind::NewsApi,
            api_key: None,
            base_url: "https://newsapi.org".to_string(),
            country: "us".to_string(),
            rss_url: "https://feeds.bbci.co.uk/news/rss.xml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub max_results: usize,
    /// Wikipedia REST base tried when the primary search finds nothing.
    /// Empty disables the fallback.
    pub fallback_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.duckduckgo.com".to_string(),
            max_results: 3,
            fallback_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" (any compatible endpoint), "mock", or "none".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub rate: u32,
    pub volume: f32,
    /// Capture attempts per turn before giving up.
    pub listen_retries: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            rate: 160,
            volume: 0.9,
            listen_retries: 3,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
