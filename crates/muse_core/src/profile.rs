//! Emotional profile: baseline, volatility and the two lookup tables.
//!
//! Both tables are built once and never mutated afterwards; a different lexicon
//! means constructing a different profile.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::types::{sanitize_unit, EmotionalState};

/// Token → state lexicon, scanned in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerTable {
    entries: Vec<(String, EmotionalState)>,
}

impl TriggerTable {
    /// Later duplicates of a token are dropped so the first mapping always wins.
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = (S, EmotionalState)>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .map(|(token, state)| (token.into().to_lowercase(), state))
            .filter(|(token, _)| seen.insert(token.clone()))
            .collect();
        Self { entries }
    }

    /// First lexicon entry (in table order, not input order) present in `words`.
    pub fn first_match(&self, words: &[String]) -> Option<(&str, EmotionalState)> {
        let present: HashSet<&str> = words.iter().map(String::as_str).collect();
        self.entries
            .iter()
            .find(|(token, _)| present.contains(token.as_str()))
            .map(|(token, state)| (token.as_str(), *state))
    }

    pub fn entries(&self) -> &[(String, EmotionalState)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TriggerTable {
    fn default() -> Self {
        use EmotionalState::*;
        Self::new([
            ("amazing", Excited),
            ("awesome", Excited),
            ("incredible", Excited),
            ("exciting", Excited),
            ("wow", Excited),
            ("love", Excited),
            ("hype", Excited),
            ("chaos", Chaotic),
            ("chaotic", Chaotic),
            ("crazy", Chaotic),
            ("random", Chaotic),
            ("wild", Chaotic),
            ("glitch", Chaotic),
            ("create", Creative),
            ("imagine", Creative),
            ("art", Creative),
            ("dream", Creative),
            ("design", Creative),
            ("invent", Creative),
            ("analyze", Analytical),
            ("analysis", Analytical),
            ("data", Analytical),
            ("logic", Analytical),
            ("code", Analytical),
            ("algorithm", Analytical),
            ("calculate", Analytical),
            ("think", Contemplative),
            ("wonder", Contemplative),
            ("why", Contemplative),
            ("meaning", Contemplative),
            ("consciousness", Contemplative),
            ("existence", Contemplative),
            ("reflect", Contemplative),
        ])
    }
}

/// State → ordered successor set, used for momentum when nothing triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    successors: BTreeMap<EmotionalState, Vec<EmotionalState>>,
}

impl TransitionTable {
    pub fn new(table: impl IntoIterator<Item = (EmotionalState, Vec<EmotionalState>)>) -> Self {
        let successors = table
            .into_iter()
            .map(|(from, mut to)| {
                let mut seen = HashSet::new();
                to.retain(|s| seen.insert(*s));
                (from, to)
            })
            .collect();
        Self { successors }
    }

    pub fn successors(&self, from: EmotionalState) -> &[EmotionalState] {
        self.successors.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        use EmotionalState::*;
        Self::new([
            (Neutral, vec![Contemplative, Analytical, Creative]),
            (Excited, vec![Chaotic, Creative, Excited]),
            (Contemplative, vec![Analytical, Contemplative, Creative]),
            (Chaotic, vec![Excited, Creative, Chaotic]),
            (Creative, vec![Excited, Contemplative, Creative]),
            (Analytical, vec![Contemplative, Analytical, Neutral]),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalProfile {
    pub base_state: EmotionalState,
    /// Probability of momentum transitions and width of the intensity jitter.
    pub volatility: f32,
    pub trigger_table: TriggerTable,
    pub transition_table: TransitionTable,
}

impl Default for EmotionalProfile {
    fn default() -> Self {
        Self::new(EmotionalState::Neutral, 0.3)
    }
}

impl EmotionalProfile {
    pub fn new(base_state: EmotionalState, volatility: f32) -> Self {
        Self {
            base_state,
            volatility: sanitize_unit(volatility, 0.3),
            trigger_table: TriggerTable::default(),
            transition_table: TransitionTable::default(),
        }
    }

    pub fn with_tables(mut self, triggers: TriggerTable, transitions: TransitionTable) -> Self {
        self.trigger_table = triggers;
        self.transition_table = transitions;
        self
    }
}
