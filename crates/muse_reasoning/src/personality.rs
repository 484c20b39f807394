//! Trait adaptation, style derivation and output shaping.

use muse_core::config::PersonalityConfig;
use muse_core::rng::component_rng;
use muse_core::trait_vector::{
    CHAOS_THRESHOLD, MEME_AFFINITY, PHILOSOPHICAL_INCLINATION, PROVOCATIVE_TENDENCY,
    TECHNICAL_DEPTH,
};
use muse_core::{
    CommunicationStyle, EmotionalProfile, EmotionalState, Environment, Memory, NarrativeMode,
    PersonalityState, TraitVector,
};
use rand::rngs::StdRng;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

use crate::directive::{self, DirectiveContext, DirectiveShape};

const RNG_STREAM: u64 = 2;

static RE_BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_ROLEPLAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
static RE_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static RE_STATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\s*state\s*:[^\]]*\]").unwrap());
static RE_SYMBOLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\p{P}\s]|[*#_~`|]").unwrap());
static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static RE_MULTI_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Trait values forced by each state. Unlisted traits keep their value.
pub fn trait_targets(state: EmotionalState) -> &'static [(&'static str, f32)] {
    match state {
        EmotionalState::Excited => &[
            (PROVOCATIVE_TENDENCY, 0.9),
            (MEME_AFFINITY, 0.85),
            (CHAOS_THRESHOLD, 0.7),
        ],
        EmotionalState::Contemplative => &[
            (PHILOSOPHICAL_INCLINATION, 0.95),
            (PROVOCATIVE_TENDENCY, 0.4),
        ],
        EmotionalState::Chaotic => &[
            (CHAOS_THRESHOLD, 0.95),
            (MEME_AFFINITY, 0.9),
            (PROVOCATIVE_TENDENCY, 0.85),
        ],
        EmotionalState::Creative => &[(MEME_AFFINITY, 0.8), (PHILOSOPHICAL_INCLINATION, 0.8)],
        EmotionalState::Analytical => &[(TECHNICAL_DEPTH, 0.95), (CHAOS_THRESHOLD, 0.3)],
        EmotionalState::Neutral => &[],
    }
}

/// Style implied by a state; `None` means "keep whatever style is current".
pub fn style_for(state: EmotionalState) -> Option<CommunicationStyle> {
    match state {
        EmotionalState::Excited => Some(CommunicationStyle::Memetic),
        EmotionalState::Contemplative => Some(CommunicationStyle::Philosophical),
        EmotionalState::Chaotic => Some(CommunicationStyle::Chaotic),
        EmotionalState::Analytical => Some(CommunicationStyle::Technical),
        EmotionalState::Creative => Some(CommunicationStyle::Poetic),
        EmotionalState::Neutral => None,
    }
}

/// Strip markdown, echoed state markers and non-text symbols from generator output.
pub fn sanitize_output(raw: &str) -> String {
    let mut result = RE_BOLD.replace_all(raw, "$1").to_string();
    loop {
        let next = RE_ROLEPLAY.replace_all(&result, "$1").to_string();
        if next == result {
            break;
        }
        result = next;
    }
    result = RE_HEADER.replace_all(&result, "").to_string();
    result = RE_SYMBOLS.replace_all(&result, "").to_string();
    // Removing one marker can splice its neighbours into another.
    while RE_STATE_MARKER.is_match(&result) {
        result = RE_STATE_MARKER.replace_all(&result, "").to_string();
    }
    result = RE_SPACES.replace_all(&result, " ").to_string();
    result = RE_MULTI_NEWLINE.replace_all(&result, "\n\n").to_string();
    result.trim().to_string()
}

pub fn state_marker(state: EmotionalState) -> String {
    format!("[state: {}]", state)
}

/// Generator output after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedResponse {
    /// Sanitized text, as remembered.
    pub body: String,
    /// What the caller sees: the body plus the state marker outside batch mode.
    pub text: String,
}

/// Owner of the personality state and the logic that shapes it.
pub struct PersonalityCore {
    state: PersonalityState,
    config: PersonalityConfig,
    rng: StdRng,
}

impl PersonalityCore {
    pub fn new(config: PersonalityConfig, profile: EmotionalProfile, seed: Option<u64>) -> Self {
        Self {
            state: PersonalityState::new(config.initial_traits(), profile),
            rng: component_rng(seed, RNG_STREAM),
            config,
        }
    }

    pub fn state(&self) -> &PersonalityState {
        &self.state
    }

    pub fn traits(&self) -> &TraitVector {
        &self.state.traits
    }

    /// Hard-overwrite the traits listed for `emotional`.
    pub fn adapt_traits(&mut self, emotional: EmotionalState) {
        for (name, value) in trait_targets(emotional) {
            self.state.traits.set(name, *value);
        }
    }

    pub fn derive_style(&mut self, emotional: EmotionalState) -> CommunicationStyle {
        if let Some(style) = style_for(emotional) {
            self.state.style = style;
        }
        self.state.style
    }

    pub fn modify_trait(&mut self, name: &str, delta: f32) -> f32 {
        let value = self.state.traits.modify(name, delta);
        tracing::debug!("Trait {} -> {:.2}", name, value);
        value
    }

    /// Fold a new stimulus into consciousness and the interaction context.
    pub fn observe_stimulus(
        &mut self,
        input: &str,
        emotional: EmotionalState,
        platform: Option<&str>,
        environment: &Environment,
    ) {
        let limit = self.config.short_term_limit;
        let consciousness = &mut self.state.consciousness;
        consciousness.emotional_state = emotional;
        consciousness.remember_stimulus(input, limit);
        consciousness.attention_focus = Some(input.chars().take(80).collect());
        if let Some(platform) = platform {
            consciousness.active_contexts.insert(platform.to_string());
        }

        let context = &mut self.state.current_context;
        context.platform = platform.map(str::to_string);
        context.record_interaction(input, limit);
        context.environmental_factors = environment.clone();
    }

    pub fn record_memory(&mut self, memory: Memory) {
        self.state.record_memory(memory, self.config.memory_list_limit);
    }

    pub fn remember_utterance(&mut self, text: &str) {
        self.state
            .consciousness
            .remember_utterance(text, self.config.short_term_limit);
    }

    pub fn set_narrative(&mut self, mode: NarrativeMode, themes: Vec<String>) {
        self.state.narrative_mode = mode;
        self.state.current_context.active_narratives = themes;
    }

    pub fn build_directive(&self, shape: DirectiveShape, ctx: &DirectiveContext<'_>) -> String {
        directive::build(shape, ctx)
    }

    /// Clean raw output and, outside batch mode, tag it with the current state.
    pub fn post_process(
        &self,
        raw: &str,
        emotional: EmotionalState,
        shape: DirectiveShape,
    ) -> ShapedResponse {
        let body = sanitize_output(raw);
        let text = match shape {
            DirectiveShape::Batch => body.clone(),
            DirectiveShape::Contextual if body.is_empty() => state_marker(emotional),
            DirectiveShape::Contextual => format!("{} {}", body, state_marker(emotional)),
        };
        ShapedResponse { body, text }
    }

    /// Whether a response is worth remembering.
    pub fn is_significant(&mut self, response: &str) -> bool {
        if response.chars().count() > self.config.significance_length {
            return true;
        }
        if self.state.emotional_state() != EmotionalState::Neutral {
            return true;
        }
        self.rng.gen::<f32>() < self.state.traits.get(CHAOS_THRESHOLD)
    }

    /// Reinitialize consciousness, profile and memory list.
    pub fn reset(&mut self, profile: EmotionalProfile) {
        let traits = self
            .config
            .reset_traits
            .then(|| self.config.initial_traits());
        self.state.reset(profile, traits);
    }
}
