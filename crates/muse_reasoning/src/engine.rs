//! The turn coordinator.
//!
//! One turn runs: classify → record stimulus → adapt → build directive →
//! generate → post-process → maybe remember → pick next narrative mode.
//!
//! Turns are serialized by `turn_lock`. The personality lock is only held for
//! the stretches before and after generation and is released while the
//! generator runs, so `snapshot()` never waits on the network. A turn is split
//! at the generator call ([`PendingTurn`]) so callers can retry generation
//! without replaying the stimulus.

use muse_core::config::MuseConfig;
use muse_core::{
    EmotionalResponse, EmotionalState, Environment, GenerationError, Memory, MemoryKind,
    NarrativeMode, PersonalityState, TurnError, ValidationError,
};
use muse_expression::NarrativeModeSelector;
use muse_limbic::EmotionalStateMachine;
use muse_memory::{MemoryStats, MemoryStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::directive::{DirectiveContext, DirectiveShape};
use crate::llm::TextGenerator;
use crate::personality::PersonalityCore;

/// Recent STM contents offered to the classifier for association.
const RECENT_MEMORY_WINDOW: usize = 10;
/// Associated memories looked up for the directive.
const DIRECTIVE_ASSOCIATIONS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub input: String,
    pub platform: Option<String>,
    pub environment: Environment,
    /// Overrides the sentinel-based shape selection.
    pub shape: Option<DirectiveShape>,
    /// Overrides the configured generation timeout.
    pub timeout: Option<Duration>,
}

impl TurnRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_shape(mut self, shape: DirectiveShape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response_text: String,
    pub state: PersonalityState,
    pub emotional_response: EmotionalResponse,
}

/// Read-only view for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub state: PersonalityState,
    pub last_response: Option<EmotionalResponse>,
    pub narrative_mode: NarrativeMode,
    pub active_themes: Vec<String>,
    pub stm_len: usize,
    pub ltm_len: usize,
    pub pattern_count: usize,
}

struct Mind {
    core: PersonalityCore,
    machine: EmotionalStateMachine,
    narrative: NarrativeModeSelector,
}

pub struct MuseEngine {
    mind: RwLock<Mind>,
    memory: Arc<MemoryStore>,
    generator: Arc<dyn TextGenerator>,
    turn_lock: Mutex<()>,
    config: MuseConfig,
}

impl MuseEngine {
    pub fn new(
        config: MuseConfig,
        memory: Arc<MemoryStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let seed = config.engine.rng_seed;
        let mind = Mind {
            core: PersonalityCore::new(config.personality.clone(), config.emotion.profile(), seed),
            machine: EmotionalStateMachine::from_config(&config.emotion, seed),
            narrative: NarrativeModeSelector::new(&config.narrative, seed),
        };
        tracing::info!(
            "Muse engine ready (generator: {}, seed: {:?})",
            generator.name(),
            seed
        );
        Self {
            mind: RwLock::new(mind),
            memory,
            generator,
            turn_lock: Mutex::new(()),
            config,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn config(&self) -> &MuseConfig {
        &self.config
    }

    fn validate(&self, input: &str) -> Result<(), ValidationError> {
        if input.trim().is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let length = input.chars().count();
        let limit = self.config.engine.max_input_chars;
        if length > limit {
            return Err(ValidationError::InputTooLong { length, limit });
        }
        Ok(())
    }

    /// Run one full interaction turn.
    ///
    /// On a generation failure or timeout the stimulus has already been
    /// recorded, but no response memory is written and the narrative mode is
    /// unchanged. Calling this again replays the whole turn; hosts that want
    /// to retry should retry [`PendingTurn::generate`] instead.
    pub async fn process_turn(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        self.begin_turn(request).await?.run().await
    }

    /// Run everything up to the generator call: classify, record the stimulus,
    /// adapt traits and build the directive.
    ///
    /// The returned turn holds the turn lock until it is completed or dropped.
    /// If this future is dropped before it resolves, no state has changed.
    pub async fn begin_turn(&self, request: TurnRequest) -> Result<PendingTurn<'_>, TurnError> {
        self.validate(&request.input)?;
        let turn_guard = self.turn_lock.lock().await;

        let TurnRequest {
            input,
            platform,
            environment,
            shape,
            timeout,
        } = request;
        let shape = DirectiveShape::resolve(&input, shape);
        let timeout = timeout.unwrap_or_else(|| self.config.engine.generation_timeout());

        let recent = self.memory.recent_contents(RECENT_MEMORY_WINDOW).await;
        let associated = self.recent_associations(&input).await;
        let mut stimulus = Memory::new(
            &input,
            MemoryKind::Interaction,
            EmotionalState::Neutral,
            platform.as_deref(),
        )?;

        let mut mind = self.mind.write().await;
        // Classify on a copy so nothing changes until the stimulus is stored.
        let mut machine = mind.machine.clone();
        let profile = mind.core.state().emotional_profile.clone();
        let emotional_response = machine.classify(&input, &recent, &profile, None);
        let emotional = emotional_response.state_or_neutral();
        stimulus.emotional_context = emotional;

        self.memory.insert_and_mine(stimulus.clone()).await;

        // No await from here on: the rest of the section commits as a unit.
        mind.machine = machine;
        mind.core
            .observe_stimulus(&input, emotional, platform.as_deref(), &environment);
        mind.core.record_memory(stimulus);
        mind.core.adapt_traits(emotional);
        let style = mind.core.derive_style(emotional);
        let mode = mind.narrative.current_mode();
        let seed = mind.narrative.render(mode, Some(style), emotional);

        let ctx = DirectiveContext {
            input: &input,
            response: &emotional_response,
            mode,
            style,
            traits: mind.core.traits(),
            associated_memories: &associated,
            platform: platform.as_deref(),
            environment: &environment,
            narrative_seed: &seed,
        };
        let directive = mind.core.build_directive(shape, &ctx);
        let snapshot = mind.core.state().clone();
        drop(mind);

        Ok(PendingTurn {
            engine: self,
            _turn: turn_guard,
            input,
            platform,
            environment,
            shape,
            timeout,
            emotional_response,
            directive,
            snapshot,
        })
    }

    /// Contents of the most recent memories sharing a word with `input`,
    /// newest first.
    async fn recent_associations(&self, input: &str) -> Vec<String> {
        let mut matches = self.memory.associated_memories(input, usize::MAX).await;
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches
            .into_iter()
            .take(DIRECTIVE_ASSOCIATIONS)
            .map(|m| m.content)
            .collect()
    }

    /// Current state. Only waits for the short synchronous sections of a turn.
    pub async fn snapshot(&self) -> EngineSnapshot {
        let MemoryStats {
            stm_len,
            ltm_len,
            pattern_count,
            ..
        } = self.memory.stats().await;
        let mind = self.mind.read().await;
        EngineSnapshot {
            state: mind.core.state().clone(),
            last_response: mind.machine.last_response().cloned(),
            narrative_mode: mind.narrative.current_mode(),
            active_themes: mind.narrative.active_themes().map(str::to_string).collect(),
            stm_len,
            ltm_len,
            pattern_count,
        }
    }

    /// Reinitialize consciousness, emotional profile, memory list and
    /// narrative state. Traits survive unless `personality.reset_traits` is set.
    pub async fn reset(&self) {
        let _turn = self.turn_lock.lock().await;
        let mut mind = self.mind.write().await;
        mind.core.reset(self.config.emotion.profile());
        mind.machine.clear_history();
        mind.narrative.reset();
        tracing::info!("Personality reset (traits reset: {})", self.config.personality.reset_traits);
    }

    pub async fn modify_trait(&self, name: &str, delta: f32) -> f32 {
        self.mind.write().await.core.modify_trait(name, delta)
    }

    pub async fn add_theme(&self, theme: &str) -> bool {
        self.mind.write().await.narrative.add_theme(theme)
    }

    pub async fn remove_theme(&self, theme: &str) -> bool {
        self.mind.write().await.narrative.remove_theme(theme)
    }

    pub async fn emotional_state(&self) -> EmotionalState {
        self.mind.read().await.core.state().emotional_state()
    }
}

/// A turn whose directive is built and which is waiting on the generator.
///
/// Holds the engine's turn lock, so no other turn starts until this one is
/// completed or dropped. Dropping it after a failed generation leaves the
/// recorded stimulus and adapted traits in place.
pub struct PendingTurn<'a> {
    engine: &'a MuseEngine,
    _turn: MutexGuard<'a, ()>,
    input: String,
    platform: Option<String>,
    environment: Environment,
    shape: DirectiveShape,
    timeout: Duration,
    emotional_response: EmotionalResponse,
    directive: String,
    snapshot: PersonalityState,
}

impl PendingTurn<'_> {
    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn emotional_response(&self) -> &EmotionalResponse {
        &self.emotional_response
    }

    /// One generator call under the turn's timeout. Changes no engine state,
    /// so it can be retried freely.
    pub async fn generate(&self) -> Result<String, TurnError> {
        let generator = &self.engine.generator;
        match tokio::time::timeout(
            self.timeout,
            generator.generate(&self.directive, &self.snapshot, &self.environment),
        )
        .await
        {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                tracing::warn!("Generation failed: {}", e);
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!("Generation timed out after {:?}", self.timeout);
                Err(GenerationError::Timeout(self.timeout).into())
            }
        }
    }

    /// Generate once and complete the turn.
    pub async fn run(self) -> Result<TurnOutcome, TurnError> {
        let raw = self.generate().await?;
        Ok(self.complete(raw).await)
    }

    /// Shape the generator output, remember it if significant and move the
    /// narrative on.
    pub async fn complete(self, raw: String) -> TurnOutcome {
        let engine = self.engine;
        let emotional = self.emotional_response.state_or_neutral();
        let platform = self.platform.as_deref();

        let mut mind = engine.mind.write().await;
        let shaped = mind.core.post_process(&raw, emotional, self.shape);
        let significant = !shaped.body.is_empty() && mind.core.is_significant(&shaped.body);
        let remembered = if significant {
            Memory::new(&shaped.body, MemoryKind::Interaction, emotional, platform).ok()
        } else {
            None
        };
        if let Some(memory) = &remembered {
            engine.memory.insert(memory.clone()).await;
        }

        if let Some(memory) = remembered {
            mind.core.remember_utterance(&shaped.body);
            mind.core.record_memory(memory);
        }
        let mode = mind.narrative.select_mode(&self.input, emotional);
        if let Some(theme) = mind.narrative.evolve_themes() {
            tracing::debug!("Narrative theme injected: {}", theme);
        }
        let themes = mind.narrative.active_themes().map(str::to_string).collect();
        mind.core.set_narrative(mode, themes);
        let state = mind.core.state().clone();
        drop(mind);

        tracing::debug!(
            "Turn complete: {} at {:.2}, {} chars",
            emotional,
            self.emotional_response.intensity,
            shaped.text.chars().count()
        );

        TurnOutcome {
            response_text: shaped.text,
            state,
            emotional_response: self.emotional_response,
        }
    }
}
