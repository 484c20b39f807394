//! Core value types shared by every subsystem.
//!
//! Emotional states, memory records and the discrete style/narrative tags are
//! closed sets: new variants are a breaking change for every table keyed by them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::text;

/// Replace NaN/Inf with the fallback and clamp into [0, 1].
#[inline]
pub fn sanitize_unit(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        tracing::warn!("non-finite unit value detected, resetting to {}", fallback);
        fallback
    }
}

/// Deserialize an `f32` that must live in [0, 1]; garbage is clamped, not rejected.
pub fn deserialize_unit_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f32::deserialize(deserializer)?;
    Ok(sanitize_unit(raw, 0.5))
}

// =============================================================================
// Emotional state
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalState {
    #[default]
    Neutral,
    Excited,
    Contemplative,
    Chaotic,
    Creative,
    Analytical,
}

impl EmotionalState {
    pub const ALL: [EmotionalState; 6] = [
        EmotionalState::Neutral,
        EmotionalState::Excited,
        EmotionalState::Contemplative,
        EmotionalState::Chaotic,
        EmotionalState::Creative,
        EmotionalState::Analytical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalState::Neutral => "neutral",
            EmotionalState::Excited => "excited",
            EmotionalState::Contemplative => "contemplative",
            EmotionalState::Chaotic => "chaotic",
            EmotionalState::Creative => "creative",
            EmotionalState::Analytical => "analytical",
        }
    }
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionalState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionalState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownTag {
                kind: "emotional state",
                value: s.to_string(),
            })
    }
}

/// Output of one stimulus classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalResponse {
    /// `None` only for the placeholder response before any stimulus.
    pub state: Option<EmotionalState>,
    #[serde(deserialize_with = "deserialize_unit_f32")]
    pub intensity: f32,
    /// The lexicon token that fired, or the input itself when nothing matched.
    pub trigger: String,
    pub duration_ms: u64,
    /// At most three memory contents sharing a token with the stimulus.
    pub associated_memories: Vec<String>,
}

impl Default for EmotionalResponse {
    fn default() -> Self {
        Self {
            state: None,
            intensity: 0.0,
            trigger: String::new(),
            duration_ms: 0,
            associated_memories: Vec::new(),
        }
    }
}

impl EmotionalResponse {
    pub fn state_or_neutral(&self) -> EmotionalState {
        self.state.unwrap_or_default()
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.duration_ms)
    }
}

// =============================================================================
// Memory records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Experience,
    Fact,
    Interaction,
    Insight,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Experience => "experience",
            MemoryKind::Fact => "fact",
            MemoryKind::Interaction => "interaction",
            MemoryKind::Insight => "insight",
        }
    }
}

impl FromStr for MemoryKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "experience" => Ok(MemoryKind::Experience),
            "fact" => Ok(MemoryKind::Fact),
            "interaction" => Ok(MemoryKind::Interaction),
            "insight" => Ok(MemoryKind::Insight),
            _ => Err(ValidationError::UnknownTag {
                kind: "memory kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle flag of a record in the durable mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    Active,
    Archived,
}

impl MemoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryStatus::Active => "active",
            MemoryStatus::Archived => "archived",
        }
    }
}

/// Importance baseline every record starts from.
const BASE_IMPORTANCE: f32 = 0.5;
/// Upper bound of the length bonus.
const MAX_LENGTH_BONUS: f32 = 0.3;
/// Bonus per sentence terminator.
const TERMINATOR_BONUS: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub content: String,
    pub kind: MemoryKind,
    pub timestamp: DateTime<Utc>,
    pub emotional_context: EmotionalState,
    pub platform: Option<String>,
    #[serde(deserialize_with = "deserialize_unit_f32")]
    pub importance: f32,
    pub associations: BTreeSet<String>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Memory {
    /// Build a fresh record stamped `now`, with heuristic importance and associations.
    pub fn new(
        content: &str,
        kind: MemoryKind,
        emotional_context: EmotionalState,
        platform: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            kind,
            timestamp: Utc::now(),
            emotional_context,
            platform: platform.filter(|p| !p.is_empty()).map(str::to_string),
            importance: Self::estimate_importance(content),
            associations: text::association_tokens(content),
            last_accessed: None,
        })
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = sanitize_unit(importance, BASE_IMPORTANCE);
        self
    }

    /// 0.5 + min(0.3, len/1000) + 0.05 per sentence terminator, clamped to [0, 1].
    pub fn estimate_importance(content: &str) -> f32 {
        let length_bonus = (content.chars().count() as f32 / 1000.0).min(MAX_LENGTH_BONUS);
        let terminators = text::sentence_terminators(content) as f32;
        (BASE_IMPORTANCE + length_bonus + TERMINATOR_BONUS * terminators).clamp(0.0, 1.0)
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = Some(now);
    }
}

/// A word that keeps recurring across stimuli.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub word: String,
    pub frequency: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

// =============================================================================
// Style & narrative tags
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationStyle {
    #[default]
    Balanced,
    Technical,
    Philosophical,
    Memetic,
    Chaotic,
    Poetic,
}

impl CommunicationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationStyle::Balanced => "balanced",
            CommunicationStyle::Technical => "technical",
            CommunicationStyle::Philosophical => "philosophical",
            CommunicationStyle::Memetic => "memetic",
            CommunicationStyle::Chaotic => "chaotic",
            CommunicationStyle::Poetic => "poetic",
        }
    }
}

impl fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeMode {
    #[default]
    Philosophical,
    Memetic,
    Technical,
    Absurdist,
    Introspective,
}

impl NarrativeMode {
    pub const ALL: [NarrativeMode; 5] = [
        NarrativeMode::Philosophical,
        NarrativeMode::Memetic,
        NarrativeMode::Technical,
        NarrativeMode::Absurdist,
        NarrativeMode::Introspective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeMode::Philosophical => "philosophical",
            NarrativeMode::Memetic => "memetic",
            NarrativeMode::Technical => "technical",
            NarrativeMode::Absurdist => "absurdist",
            NarrativeMode::Introspective => "introspective",
        }
    }
}

impl fmt::Display for NarrativeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
