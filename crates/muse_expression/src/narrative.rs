use chrono::{DateTime, Utc};
use muse_core::config::NarrativeConfig;
use muse_core::rng::component_rng;
use muse_core::text::words;
use muse_core::{CommunicationStyle, EmotionalState, NarrativeMode};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::templates::{self, flavor_suffix, style_keywords};

const RNG_STREAM: u64 = 3;

/// Bonus for a mode whose compatible states include the current one.
const STATE_BONUS: u32 = 2;

/// One past selection, kept for introspection and status output.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeEntry {
    pub input: String,
    pub state: EmotionalState,
    pub mode: NarrativeMode,
    pub at: DateTime<Utc>,
}

pub struct NarrativeModeSelector {
    current: NarrativeMode,
    active_themes: BTreeSet<String>,
    history: VecDeque<NarrativeEntry>,
    history_limit: usize,
    theme_injection_probability: f32,
    rng: StdRng,
}

impl NarrativeModeSelector {
    pub fn new(config: &NarrativeConfig, seed: Option<u64>) -> Self {
        Self {
            current: NarrativeMode::default(),
            active_themes: BTreeSet::new(),
            history: VecDeque::new(),
            history_limit: config.history_limit.max(1),
            theme_injection_probability: config.theme_injection_probability.clamp(0.0, 1.0),
            rng: component_rng(seed, RNG_STREAM),
        }
    }

    pub fn current_mode(&self) -> NarrativeMode {
        self.current
    }

    /// Score of every mode for this input and state, in `NarrativeMode::ALL` order.
    pub fn scores(&self, input: &str, state: EmotionalState) -> Vec<(NarrativeMode, u32)> {
        let tokens: HashSet<String> = words(input).into_iter().collect();
        NarrativeMode::ALL
            .iter()
            .map(|&mode| {
                let spec = templates::spec(mode);
                let trigger_hits = spec
                    .triggers
                    .iter()
                    .filter(|t| tokens.contains(**t))
                    .count() as u32;
                let state_bonus = if spec.compatible_states.contains(&state) {
                    STATE_BONUS
                } else {
                    0
                };
                let theme_hits = spec
                    .themes
                    .iter()
                    .filter(|t| self.active_themes.contains(**t))
                    .count() as u32;
                (mode, trigger_hits + state_bonus + theme_hits)
            })
            .collect()
    }

    /// Switch to the best-scoring mode.
    ///
    /// Only a unique, positive maximum causes a switch; ties and all-zero
    /// scores keep the current mode.
    pub fn select_mode(&mut self, input: &str, state: EmotionalState) -> NarrativeMode {
        let scores = self.scores(input, state);
        let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
        let leaders: Vec<NarrativeMode> = scores
            .iter()
            .filter(|(_, s)| *s == best)
            .map(|(m, _)| *m)
            .collect();

        if best > 0 && leaders.len() == 1 {
            if leaders[0] != self.current {
                tracing::debug!("Narrative mode {} -> {}", self.current, leaders[0]);
            }
            self.current = leaders[0];
        }

        self.history.push_back(NarrativeEntry {
            input: input.to_string(),
            state,
            mode: self.current,
            at: Utc::now(),
        });
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        self.current
    }

    /// Fill a template for `mode`, preferring ones that suit `style`.
    pub fn render(
        &mut self,
        mode: NarrativeMode,
        style: Option<CommunicationStyle>,
        state: EmotionalState,
    ) -> String {
        let all = templates::spec(mode).templates;
        let keywords = style.map(style_keywords).unwrap_or(&[]);
        let preferred: Vec<&str> = all
            .iter()
            .copied()
            .filter(|t| keywords.iter().any(|k| t.contains(k)))
            .collect();

        let picked = if preferred.is_empty() {
            all.choose(&mut self.rng).copied()
        } else {
            preferred.choose(&mut self.rng).copied()
        };
        let template = picked.unwrap_or("{concept}");

        format!(
            "{}{}",
            templates::fill(template, &mut self.rng),
            flavor_suffix(state)
        )
    }

    // ========================================================================
    // Themes
    // ========================================================================

    /// Returns `false` if the theme was already active.
    pub fn add_theme(&mut self, theme: &str) -> bool {
        let theme = theme.trim().to_lowercase();
        if theme.is_empty() {
            return false;
        }
        self.active_themes.insert(theme)
    }

    pub fn remove_theme(&mut self, theme: &str) -> bool {
        self.active_themes.remove(&theme.trim().to_lowercase())
    }

    pub fn active_themes(&self) -> impl Iterator<Item = &str> {
        self.active_themes.iter().map(String::as_str)
    }

    /// With the configured probability, activate a random theme of the
    /// current mode. Returns the theme if one was newly activated.
    pub fn evolve_themes(&mut self) -> Option<String> {
        if self.rng.gen::<f32>() >= self.theme_injection_probability {
            return None;
        }
        let theme = templates::spec(self.current).themes.choose(&mut self.rng)?;
        if self.add_theme(theme) {
            tracing::debug!("Theme activated: {}", theme);
            Some(theme.to_string())
        } else {
            None
        }
    }

    // ========================================================================
    // Misc
    // ========================================================================

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &NarrativeEntry> {
        self.history.iter()
    }

    pub fn reset(&mut self) {
        self.current = NarrativeMode::default();
        self.active_themes.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(p: f32) -> NarrativeModeSelector {
        NarrativeModeSelector::new(
            &NarrativeConfig {
                history_limit: 5,
                theme_injection_probability: p,
            },
            Some(11),
        )
    }

    #[test]
    fn test_all_zero_scores_keep_mode() {
        let mut s = selector(0.0);
        s.select_mode("let me check the data protocol", EmotionalState::Analytical);
        assert_eq!(s.current_mode(), NarrativeMode::Technical);

        // No triggers, neutral state, no themes: every score is zero.
        assert!(s
            .scores("hello there", EmotionalState::Neutral)
            .iter()
            .all(|(_, score)| *score == 0));
        assert_eq!(
            s.select_mode("hello there", EmotionalState::Neutral),
            NarrativeMode::Technical
        );
    }

    #[test]
    fn test_ties_keep_mode() {
        let mut s = selector(0.0);
        // Chaotic is compatible with memetic and absurdist: 2 vs 2.
        assert_eq!(
            s.select_mode("hello", EmotionalState::Chaotic),
            NarrativeMode::Philosophical
        );
    }

    #[test]
    fn test_state_bonus_and_triggers() {
        let mut s = selector(0.0);
        // Contemplative: philosophical 2 + "meaning" 1 = 3; introspective 2.
        assert_eq!(
            s.select_mode("what is the meaning of it", EmotionalState::Contemplative),
            NarrativeMode::Philosophical
        );
        // Creative ties absurdist and introspective, "dream" breaks the tie.
        assert_eq!(
            s.select_mode("I had a dream", EmotionalState::Creative),
            NarrativeMode::Introspective
        );
    }

    #[test]
    fn test_active_themes_add_score() {
        let mut s = selector(0.0);
        assert!(s.add_theme("Glitch Art"));
        assert!(!s.add_theme("glitch art"));
        let scores = s.scores("hello", EmotionalState::Neutral);
        assert!(scores.contains(&(NarrativeMode::Absurdist, 1)));
        assert!(s.remove_theme("glitch art"));
        assert_eq!(s.active_themes().count(), 0);
    }

    #[test]
    fn test_render_appends_flavor() {
        let mut s = selector(0.0);
        let text = s.render(NarrativeMode::Technical, None, EmotionalState::Excited);
        assert!(text.ends_with("!!!"));
        assert!(!text.contains('{'));

        let neutral = s.render(NarrativeMode::Memetic, Some(CommunicationStyle::Memetic), EmotionalState::Neutral);
        assert!(!neutral.ends_with('!'));
    }

    #[test]
    fn test_evolve_themes_probability() {
        let mut never = selector(0.0);
        for _ in 0..20 {
            assert!(never.evolve_themes().is_none());
        }

        let mut always = selector(1.0);
        let theme = always.evolve_themes().unwrap();
        assert!(templates::spec(NarrativeMode::Philosophical)
            .themes
            .contains(&theme.as_str()));
    }

    #[test]
    fn test_history_bounded() {
        let mut s = selector(0.0);
        for i in 0..9 {
            s.select_mode(&format!("turn {}", i), EmotionalState::Neutral);
        }
        assert_eq!(s.history().count(), 5);
        assert_eq!(s.history().next().unwrap().input, "turn 4");
    }
}
