use muse_core::config::EmotionConfig;
use muse_core::rng::component_rng;
use muse_core::text::{shares_token, words};
use muse_core::types::sanitize_unit;
use muse_core::{EmotionalProfile, EmotionalResponse, EmotionalState};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

use crate::intensity;

/// Random stream reserved for the state machine.
const RNG_STREAM: u64 = 1;

/// Memories attached to a single response.
const MAX_ASSOCIATED: usize = 3;

/// Stimulus → emotional response classifier with a short memory of its own outputs.
#[derive(Clone)]
pub struct EmotionalStateMachine {
    /// Most recent response last.
    history: VecDeque<EmotionalResponse>,
    history_limit: usize,
    /// Used when the caller supplies no base intensity.
    default_intensity: f32,
    rng: StdRng,
}

impl EmotionalStateMachine {
    pub fn new(history_limit: usize, default_intensity: f32, rng: StdRng) -> Self {
        Self {
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
            default_intensity: sanitize_unit(default_intensity, 0.5),
            rng,
        }
    }

    pub fn from_config(config: &EmotionConfig, seed: Option<u64>) -> Self {
        Self::new(
            config.history_limit,
            config.base_intensity,
            component_rng(seed, RNG_STREAM),
        )
    }

    /// Classify `text` against `profile`.
    ///
    /// `recent_memories` is ordered oldest first; associations are returned
    /// most recent first. Never fails: input with no trigger falls back to
    /// momentum or the profile's base state, and input with no words at all
    /// always lands on the base state.
    pub fn classify(
        &mut self,
        text: &str,
        recent_memories: &[String],
        profile: &EmotionalProfile,
        base_intensity: Option<f32>,
    ) -> EmotionalResponse {
        let tokens = words(text);

        let (state, trigger) = match profile.trigger_table.first_match(&tokens) {
            Some((token, state)) => (state, token.to_string()),
            None if tokens.is_empty() => (profile.base_state, text.to_string()),
            None => (self.momentum(profile), text.to_string()),
        };

        let base = base_intensity
            .map(|b| sanitize_unit(b, self.default_intensity))
            .unwrap_or(self.default_intensity);
        let mut level = intensity::compute(&mut self.rng, state, base, profile.volatility);
        if tokens.is_empty() {
            level = level.max(intensity::EMPTY_INPUT_FLOOR);
        }

        let associated_memories: Vec<String> = recent_memories
            .iter()
            .rev()
            .filter(|m| shares_token(&tokens, m))
            .take(MAX_ASSOCIATED)
            .cloned()
            .collect();

        let response = EmotionalResponse {
            state: Some(state),
            intensity: level,
            trigger,
            duration_ms: intensity::duration_ms(level),
            associated_memories,
        };

        tracing::debug!(
            "Classified stimulus as {} (intensity {:.2}, trigger {:?})",
            state,
            level,
            response.trigger
        );

        self.push_history(response.clone());
        response
    }

    /// State chosen when no lexicon entry fires.
    fn momentum(&mut self, profile: &EmotionalProfile) -> EmotionalState {
        let Some(previous) = self.history.back() else {
            return profile.base_state;
        };
        let successors = profile
            .transition_table
            .successors(previous.state_or_neutral());

        if self.rng.gen::<f32>() < profile.volatility {
            if let Some(next) = successors.choose(&mut self.rng) {
                return *next;
            }
        }
        profile.base_state
    }

    fn push_history(&mut self, response: EmotionalResponse) {
        if self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(response);
    }

    pub fn last_response(&self) -> Option<&EmotionalResponse> {
        self.history.back()
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &EmotionalResponse> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for EmotionalStateMachine {
    fn default() -> Self {
        Self::from_config(&EmotionConfig::default(), None)
    }
}
