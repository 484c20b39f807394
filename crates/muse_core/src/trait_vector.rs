//! Named personality traits in [0, 1].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::sanitize_unit;

pub const TECHNICAL_DEPTH: &str = "technical_depth";
pub const PROVOCATIVE_TENDENCY: &str = "provocative_tendency";
pub const CHAOS_THRESHOLD: &str = "chaos_threshold";
pub const PHILOSOPHICAL_INCLINATION: &str = "philosophical_inclination";
pub const MEME_AFFINITY: &str = "meme_affinity";

/// Value read for a trait that has never been set.
pub const UNKNOWN_TRAIT_VALUE: f32 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitVector(BTreeMap<String, f32>);

impl TraitVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline persona traits.
    pub fn defaults() -> Self {
        [
            (TECHNICAL_DEPTH, 0.8),
            (PROVOCATIVE_TENDENCY, 0.7),
            (CHAOS_THRESHOLD, 0.6),
            (PHILOSOPHICAL_INCLINATION, 0.75),
            (MEME_AFFINITY, 0.65),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    pub fn get(&self, name: &str) -> f32 {
        self.0.get(name).copied().unwrap_or(UNKNOWN_TRAIT_VALUE)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Overwrite a trait. Returns the stored (clamped) value.
    pub fn set(&mut self, name: &str, value: f32) -> f32 {
        let current = self.get(name);
        let value = sanitize_unit(value, current);
        self.0.insert(name.to_string(), value);
        value
    }

    /// Nudge a trait by `delta`, starting from 0.5 when unknown.
    pub fn modify(&mut self, name: &str, delta: f32) -> f32 {
        let current = self.get(name);
        let next = current + delta;
        // NaN deltas leave the trait untouched; infinities saturate.
        let next = if next.is_nan() { current } else { next.clamp(0.0, 1.0) };
        self.0.insert(name.to_string(), next);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One-line `name=value` summary for directives and logs.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={:.2}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for TraitVector {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut traits = TraitVector::new();
        for (name, value) in iter {
            let name = name.into();
            traits.set(&name, value);
        }
        traits
    }
}
