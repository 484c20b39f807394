//! Frequency-based recurring-word detection.

use chrono::{DateTime, Utc};
use muse_core::text::words;
use muse_core::Pattern;
use std::collections::{BTreeMap, HashMap};

/// Occurrences within a single text needed before an untracked word becomes a pattern.
pub const NEW_PATTERN_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct PatternMiner {
    patterns: HashMap<String, Pattern>,
}

impl PatternMiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count words in `content` and fold them into the tracked set.
    ///
    /// Returns every pattern that was created or updated, for mirroring.
    pub fn observe(&mut self, content: &str, now: DateTime<Utc>) -> Vec<Pattern> {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for word in words(content) {
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut changed = Vec::new();
        for (word, count) in counts {
            if let Some(existing) = self.patterns.get_mut(&word) {
                existing.frequency = existing.frequency.saturating_add(count);
                existing.last_seen = now;
                changed.push(existing.clone());
            } else if count >= NEW_PATTERN_THRESHOLD {
                let pattern = Pattern {
                    word: word.clone(),
                    frequency: count,
                    first_seen: now,
                    last_seen: now,
                };
                tracing::debug!("New pattern detected: {:?} x{}", word, count);
                self.patterns.insert(word, pattern.clone());
                changed.push(pattern);
            }
        }
        changed
    }

    /// Seed the tracked set with previously persisted patterns.
    ///
    /// A word already tracked keeps whichever record has the higher frequency.
    pub fn restore(&mut self, patterns: impl IntoIterator<Item = Pattern>) {
        for pattern in patterns {
            match self.patterns.get(&pattern.word) {
                Some(existing) if existing.frequency >= pattern.frequency => {}
                _ => {
                    self.patterns.insert(pattern.word.clone(), pattern);
                }
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<&Pattern> {
        self.patterns.get(word)
    }

    /// Highest frequency first; ties broken alphabetically.
    pub fn sorted(&self) -> Vec<Pattern> {
        let mut all: Vec<Pattern> = self.patterns.values().cloned().collect();
        all.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.word.cmp(&b.word)));
        all
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
