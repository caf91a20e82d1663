//! Configuration for the context system.
//!
//! Options can be loaded from a JSON or YAML file and then overridden by
//! `AVATAR_CONTEXT_*` environment variables. Every group has sensible
//! defaults, so an empty file is a valid configuration.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    ConversationGuidelines, MemoryCapacity, PersonalityTraits, PriorityWeights, SystemContext,
    TechnicalLimits,
};

/// Default number of recent messages in the immediate layer
pub const DEFAULT_CONTEXT_WINDOW: usize = 20;

/// Default token budget advertised in the system layer
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Option Groups
// ============================================================================

/// Context cache options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached contexts
    pub max_size: usize,
    /// Entry time-to-live in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl_secs: 1800,
        }
    }
}

/// Memory tier capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Short-term message capacity
    pub short_term: usize,
    /// Long-term significant interaction capacity
    pub long_term: usize,
    /// Working memory slots (active processes + scratch entries)
    pub working_memory: usize,
    /// Number of recent contexts kept in short-term memory
    pub recent_contexts: usize,
    /// Minimum impact for an interaction to be remembered long-term
    pub significance_threshold: f64,
    /// Upper bound on items returned by a memory query
    pub max_relevant_results: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term: 50,
            long_term: 200,
            working_memory: 20,
            recent_contexts: 10,
            significance_threshold: 0.7,
            max_relevant_results: 10,
        }
    }
}

/// Context compression options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Serialized context size (bytes) above which compression kicks in
    pub compression_threshold: usize,
    /// Maximum number of messages retained after compression
    pub retention_period: usize,
    /// Minimum share of total importance the retained messages should carry
    pub quality_threshold: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            compression_threshold: 10 * 1024,
            retention_period: 10,
            quality_threshold: 0.7,
        }
    }
}

/// Validator options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Treat medium-severity errors as fatal
    pub strict_mode: bool,
    /// Maximum number of errors reported per validation
    pub max_errors: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_errors: 50,
        }
    }
}

/// Emotion scoring constants.
///
/// These were tuned empirically; they are kept overridable rather than
/// re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub text_weight: f64,
    pub contextual_weight: f64,
    pub historical_weight: f64,
    pub exact_match_boost: f64,
    pub multi_match_boost: f64,
    pub strong_boost: f64,
    pub very_strong_boost: f64,
    pub agreement_boost: f64,
    pub disagreement_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            text_weight: 0.6,
            contextual_weight: 0.3,
            historical_weight: 0.1,
            exact_match_boost: 1.8,
            multi_match_boost: 1.4,
            strong_boost: 1.2,
            very_strong_boost: 1.5,
            agreement_boost: 1.2,
            disagreement_penalty: 0.8,
        }
    }
}

// ============================================================================
// ContextSystemConfig
// ============================================================================

/// Full configuration surface of the context system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSystemConfig {
    pub cache: CacheConfig,
    pub memory: MemoryConfig,
    pub compression: CompressionConfig,
    pub validator: ValidatorConfig,
    pub scoring: ScoringWeights,
    pub personality: PersonalityTraits,
    /// Recent messages kept in the immediate layer
    pub context_window: usize,
    /// Token budget advertised to response generation
    pub max_tokens: usize,
    /// Advisory only; nothing on the core path enforces it
    pub processing_timeout_ms: u64,
    /// IANA timezone used for time of day in environment metadata
    pub timezone: String,
    pub log_level: String,
}

impl Default for ContextSystemConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            memory: MemoryConfig::default(),
            compression: CompressionConfig::default(),
            validator: ValidatorConfig::default(),
            scoring: ScoringWeights::default(),
            personality: PersonalityTraits::default(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_tokens: DEFAULT_MAX_TOKENS,
            processing_timeout_ms: 5000,
            timezone: "UTC".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ContextSystemConfig {
    /// Load configuration from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config: Self = match extension.as_str() {
            "json" => Self::from_json_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override selected options from `AVATAR_CONTEXT_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<usize>("AVATAR_CONTEXT_CACHE_MAX_SIZE") {
            self.cache.max_size = v;
        }
        if let Some(v) = env_parse::<u64>("AVATAR_CONTEXT_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_parse::<usize>("AVATAR_CONTEXT_COMPRESSION_THRESHOLD") {
            self.compression.compression_threshold = v;
        }
        if let Some(v) = env_parse::<bool>("AVATAR_CONTEXT_STRICT_MODE") {
            self.validator.strict_mode = v;
        }
        if let Ok(level) = std::env::var("AVATAR_CONTEXT_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Check capacities, weights and thresholds.
    pub fn validate(&self) -> ConfigResult<()> {
        let capacities = [
            ("cache.max_size", self.cache.max_size),
            ("memory.short_term", self.memory.short_term),
            ("memory.long_term", self.memory.long_term),
            ("memory.working_memory", self.memory.working_memory),
            ("compression.retention_period", self.compression.retention_period),
            ("context_window", self.context_window),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
            }
        }

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown timezone '{}'",
                self.timezone
            )));
        }

        let unit_values = [
            ("memory.significance_threshold", self.memory.significance_threshold),
            ("compression.quality_threshold", self.compression.quality_threshold),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be within [0, 1]", name)));
            }
        }

        let s = &self.scoring;
        let weights = [
            s.text_weight,
            s.contextual_weight,
            s.historical_weight,
            s.exact_match_boost,
            s.multi_match_boost,
            s.strong_boost,
            s.very_strong_boost,
            s.agreement_boost,
            s.disagreement_penalty,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "scoring weights must be finite and non-negative".to_string(),
            ));
        }
        if s.text_weight + s.contextual_weight + s.historical_weight <= 0.0 {
            return Err(ConfigError::Invalid(
                "at least one emotion signal weight must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the system layer advertised in every context.
    pub fn system_context(&self) -> SystemContext {
        SystemContext {
            personality: self.personality.clone(),
            guidelines: ConversationGuidelines {
                context_window: self.context_window,
                priority_weights: PriorityWeights::default(),
            },
            limits: TechnicalLimits {
                max_tokens: self.max_tokens,
                cache_size: self.cache.max_size,
                memory_capacity: MemoryCapacity {
                    short_term: self.memory.short_term,
                    long_term: self.memory.long_term,
                    working_memory: self.memory.working_memory,
                },
            },
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable value for {}: {}", key, raw);
            None
        }
    }
}
