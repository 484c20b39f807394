//! The composite personality state mutated by every turn.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::profile::EmotionalProfile;
use crate::trait_vector::TraitVector;
use crate::types::{CommunicationStyle, EmotionalState, Memory, NarrativeMode};

/// Free-form environment descriptor supplied by the caller (time of day, channel, ...).
pub type Environment = BTreeMap<String, String>;

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, limit: usize) {
    buf.push_back(item);
    while buf.len() > limit {
        buf.pop_front();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consciousness {
    pub emotional_state: EmotionalState,
    pub current_thought: Option<String>,
    /// Raw recent stimuli, oldest first.
    pub short_term_memory: VecDeque<String>,
    /// Things the persona itself said that were worth keeping.
    pub long_term_memory: VecDeque<String>,
    pub attention_focus: Option<String>,
    pub active_contexts: BTreeSet<String>,
}

impl Consciousness {
    pub fn remember_stimulus(&mut self, thought: &str, limit: usize) {
        self.current_thought = Some(thought.to_string());
        push_bounded(&mut self.short_term_memory, thought.to_string(), limit);
    }

    pub fn remember_utterance(&mut self, utterance: &str, limit: usize) {
        push_bounded(&mut self.long_term_memory, utterance.to_string(), limit);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
    pub platform: Option<String>,
    pub recent_interactions: VecDeque<String>,
    pub environmental_factors: Environment,
    pub active_narratives: Vec<String>,
}

impl InteractionContext {
    pub fn record_interaction(&mut self, input: &str, limit: usize) {
        push_bounded(&mut self.recent_interactions, input.to_string(), limit);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityState {
    pub consciousness: Consciousness,
    pub emotional_profile: EmotionalProfile,
    /// Memories written during turns, oldest first.
    pub memories: VecDeque<Memory>,
    pub style: CommunicationStyle,
    pub narrative_mode: NarrativeMode,
    pub current_context: InteractionContext,
    pub traits: TraitVector,
}

impl Default for PersonalityState {
    fn default() -> Self {
        Self::new(TraitVector::defaults(), EmotionalProfile::default())
    }
}

impl PersonalityState {
    pub fn new(traits: TraitVector, emotional_profile: EmotionalProfile) -> Self {
        let consciousness = Consciousness {
            emotional_state: emotional_profile.base_state,
            ..Default::default()
        };
        Self {
            consciousness,
            emotional_profile,
            memories: VecDeque::new(),
            style: CommunicationStyle::default(),
            narrative_mode: NarrativeMode::default(),
            current_context: InteractionContext::default(),
            traits,
        }
    }

    pub fn emotional_state(&self) -> EmotionalState {
        self.consciousness.emotional_state
    }

    pub fn record_memory(&mut self, memory: Memory, limit: usize) {
        push_bounded(&mut self.memories, memory, limit);
    }

    /// Reinitialize consciousness, emotional profile and memory list.
    ///
    /// Traits are only replaced when `traits` is `Some`; style, narrative mode
    /// and context survive a reset.
    pub fn reset(&mut self, emotional_profile: EmotionalProfile, traits: Option<TraitVector>) {
        self.consciousness = Consciousness {
            emotional_state: emotional_profile.base_state,
            ..Default::default()
        };
        self.emotional_profile = emotional_profile;
        self.memories.clear();
        if let Some(traits) = traits {
            self.traits = traits;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trait_vector::CHAOS_THRESHOLD;
    use crate::types::MemoryKind;

    #[test]
    fn test_short_term_memory_is_bounded() {
        let mut c = Consciousness::default();
        for i in 0..15 {
            c.remember_stimulus(&format!("thought {}", i), 10);
        }
        assert_eq!(c.short_term_memory.len(), 10);
        assert_eq!(c.short_term_memory.front().unwrap(), "thought 5");
        assert_eq!(c.current_thought.as_deref(), Some("thought 14"));
    }

    #[test]
    fn test_reset_keeps_traits_when_not_supplied() {
        let mut state = PersonalityState::default();
        state.traits.set(CHAOS_THRESHOLD, 0.1);
        state.consciousness.remember_stimulus("hi", 10);
        state.record_memory(
            Memory::new("hi", MemoryKind::Interaction, EmotionalState::Neutral, None).unwrap(),
            10,
        );

        state.reset(EmotionalProfile::default(), None);

        assert!(state.memories.is_empty());
        assert!(state.consciousness.short_term_memory.is_empty());
        assert!((state.traits.get(CHAOS_THRESHOLD) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_reset_with_traits_restores_them() {
        let mut state = PersonalityState::default();
        state.traits.set(CHAOS_THRESHOLD, 0.1);
        state.reset(EmotionalProfile::default(), Some(TraitVector::defaults()));
        assert!((state.traits.get(CHAOS_THRESHOLD) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_state_serializes() {
        let state = PersonalityState::default();
        let json = serde_json::to_string(&state).unwrap();
        let back: PersonalityState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
