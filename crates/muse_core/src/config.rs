use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::profile::EmotionalProfile;
use crate::trait_vector::TraitVector;
use crate::types::EmotionalState;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MuseConfig {
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub emotion: EmotionConfig,
    pub personality: PersonalityConfig,
    pub narrative: NarrativeConfig,
    pub engine: EngineConfig,
}

impl MuseConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: MuseConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(n) = env_parse("MUSE_STM_LIMIT") {
            self.memory.stm_limit = n;
        }
        if let Some(n) = env_parse("MUSE_LTM_LIMIT") {
            self.memory.ltm_limit = n;
        }
        if let Some(v) = env_parse("MUSE_VOLATILITY") {
            self.emotion.volatility = v;
        }
        if let Some(seed) = env_parse("MUSE_RNG_SEED") {
            self.engine.rng_seed = Some(seed);
        }
        if let Some(secs) = env_parse("MUSE_GENERATION_TIMEOUT_SECS") {
            self.engine.generation_timeout_secs = secs;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "mock" or "openai" (any OpenAI-compatible endpoint).
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            max_tokens: 512,
            temperature: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub stm_limit: usize,
    pub ltm_limit: usize,
    /// STM entries older than this are candidates for consolidation.
    pub consolidation_age_secs: i64,
    /// Candidates must be strictly more important than this.
    pub consolidation_importance: f32,
    pub retention_days: i64,
    /// Memories above this importance survive `clear_old_memories` forever.
    pub retention_importance: f32,
    /// How often the host runs `consolidate()`.
    pub consolidation_interval_secs: u64,
    /// SQLite file for the durable mirror; `None` keeps memories in-process only.
    pub db_path: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            stm_limit: 100,
            ltm_limit: 1000,
            consolidation_age_secs: 3600,
            consolidation_importance: 0.7,
            retention_days: 30,
            retention_importance: 0.8,
            consolidation_interval_secs: 3600,
            db_path: None,
        }
    }
}

impl MemoryConfig {
    pub fn consolidation_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.consolidation_age_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub base_state: EmotionalState,
    pub volatility: f32,
    pub base_intensity: f32,
    pub history_limit: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            base_state: EmotionalState::Neutral,
            volatility: 0.3,
            base_intensity: 0.5,
            history_limit: 10,
        }
    }
}

impl EmotionConfig {
    pub fn profile(&self) -> EmotionalProfile {
        EmotionalProfile::new(self.base_state, self.volatility)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    /// Starting trait values; traits missing here start from the built-in defaults.
    pub traits: std::collections::BTreeMap<String, f32>,
    /// Whether `reset` also restores the trait vector.
    pub reset_traits: bool,
    /// Responses longer than this (chars) are always significant.
    pub significance_length: usize,
    pub short_term_limit: usize,
    pub memory_list_limit: usize,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            traits: Default::default(),
            reset_traits: false,
            significance_length: 50,
            short_term_limit: 10,
            memory_list_limit: 50,
        }
    }
}

impl PersonalityConfig {
    pub fn initial_traits(&self) -> TraitVector {
        let mut traits = TraitVector::defaults();
        for (name, value) in &self.traits {
            traits.set(name, *value);
        }
        traits
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub history_limit: usize,
    pub theme_injection_probability: f32,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            theme_injection_probability: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub generation_timeout_secs: u64,
    pub max_input_chars: usize,
    /// Fixed seed for every random source; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 30,
            max_input_chars: 4000,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
