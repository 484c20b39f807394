//! Assembly of the instruction text handed to the generator.

use muse_core::{CommunicationStyle, EmotionalResponse, Environment, NarrativeMode, TraitVector};
use serde::{Deserialize, Serialize};

/// Input value that historically requested a batch directive.
pub const BATCH_SENTINEL: &str = "generate_batch_content";

/// Associations included in a directive.
const MAX_ASSOCIATIONS: usize = 3;

const GUIDELINES: &str = "\
- Stay in character; never mention being a language model.
- Let the emotional state color tone and rhythm, not the facts.
- Keep it under 280 characters unless the stimulus asks for depth.
- No hashtags, no markdown, no roleplay asterisks.
- Use the narrative seed as a springboard, not a script.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveShape {
    /// Minimal directive for standalone content with no conversational context.
    Batch,
    /// Full directive for answering a stimulus.
    Contextual,
}

impl DirectiveShape {
    /// An explicit shape wins; otherwise the batch sentinel input selects `Batch`.
    pub fn resolve(input: &str, explicit: Option<DirectiveShape>) -> Self {
        match explicit {
            Some(shape) => shape,
            None if input.trim() == BATCH_SENTINEL => DirectiveShape::Batch,
            None => DirectiveShape::Contextual,
        }
    }
}

/// Everything a directive may mention.
pub struct DirectiveContext<'a> {
    pub input: &'a str,
    pub response: &'a EmotionalResponse,
    pub mode: NarrativeMode,
    pub style: CommunicationStyle,
    pub traits: &'a TraitVector,
    /// Most relevant first.
    pub associated_memories: &'a [String],
    pub platform: Option<&'a str>,
    pub environment: &'a Environment,
    pub narrative_seed: &'a str,
}

pub fn build(shape: DirectiveShape, ctx: &DirectiveContext<'_>) -> String {
    let state = ctx.response.state_or_neutral();
    match shape {
        DirectiveShape::Batch => format!(
            "You are Muse. Write one standalone post.\n\nEmotional state: {} (intensity {:.2})\nNarrative mode: {}\nSeed: {}\n\n== GUIDELINES ==\n{}",
            state,
            ctx.response.intensity,
            ctx.mode,
            ctx.narrative_seed,
            GUIDELINES
        ),
        DirectiveShape::Contextual => {
            let associations = if ctx.associated_memories.is_empty() {
                "(none)".to_string()
            } else {
                ctx.associated_memories
                    .iter()
                    .take(MAX_ASSOCIATIONS)
                    .map(|m| format!("- {}", m))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            let environment = if ctx.environment.is_empty() {
                "(none)".to_string()
            } else {
                ctx.environment
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join("\n")
            };

            format!(
                "You are Muse, a synthetic personality with moods, memories and opinions.\n\n\
                 == CURRENT STATE ==\n\
                 Emotional state: {} (intensity {:.2}, triggered by {:?})\n\
                 Narrative mode: {}\n\
                 Communication style: {}\n\
                 Traits: {}\n\n\
                 == ASSOCIATED MEMORIES ==\n{}\n\n\
                 == PLATFORM ==\n{}\n\n\
                 == ENVIRONMENT ==\n{}\n\n\
                 == NARRATIVE SEED ==\n{}\n\n\
                 == GUIDELINES ==\n{}\n\n\
                 Stimulus: {}",
                state,
                ctx.response.intensity,
                ctx.response.trigger,
                ctx.mode,
                ctx.style,
                ctx.traits.describe(),
                associations,
                ctx.platform.unwrap_or("unspecified"),
                environment,
                ctx.narrative_seed,
                GUIDELINES,
                ctx.input
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_core::EmotionalState;

    fn response() -> EmotionalResponse {
        EmotionalResponse {
            state: Some(EmotionalState::Excited),
            intensity: 0.72,
            trigger: "amazing".into(),
            duration_ms: 4600,
            associated_memories: vec![],
        }
    }

    #[test]
    fn test_shape_resolution() {
        assert_eq!(DirectiveShape::resolve(BATCH_SENTINEL, None), DirectiveShape::Batch);
        assert_eq!(DirectiveShape::resolve("hello", None), DirectiveShape::Contextual);
        assert_eq!(
            DirectiveShape::resolve(BATCH_SENTINEL, Some(DirectiveShape::Contextual)),
            DirectiveShape::Contextual
        );
        assert_eq!(
            DirectiveShape::resolve("hello", Some(DirectiveShape::Batch)),
            DirectiveShape::Batch
        );
    }

    #[test]
    fn test_contextual_directive_contents() {
        let traits = TraitVector::defaults();
        let memories: Vec<String> = ["one", "two", "three", "four"].iter().map(|s| s.to_string()).collect();
        let mut env = Environment::new();
        env.insert("time_of_day".into(), "night".into());
        let response = response();
        let ctx = DirectiveContext {
            input: "this is amazing!",
            response: &response,
            mode: NarrativeMode::Memetic,
            style: CommunicationStyle::Memetic,
            traits: &traits,
            associated_memories: &memories,
            platform: Some("twitter"),
            environment: &env,
            narrative_seed: "galaxy brain, but make it about time!!!",
        };

        let text = build(DirectiveShape::Contextual, &ctx);
        assert!(text.contains("Emotional state: excited (intensity 0.72"));
        assert!(text.contains("Narrative mode: memetic"));
        assert!(text.contains("- three"));
        assert!(!text.contains("- four"));
        assert!(text.contains("twitter"));
        assert!(text.contains("time_of_day: night"));
        assert!(text.contains("== GUIDELINES =="));
        assert!(text.ends_with("Stimulus: this is amazing!"));
    }

    #[test]
    fn test_batch_directive_is_minimal() {
        let traits = TraitVector::defaults();
        let env = Environment::new();
        let response = response();
        let ctx = DirectiveContext {
            input: BATCH_SENTINEL,
            response: &response,
            mode: NarrativeMode::Technical,
            style: CommunicationStyle::Technical,
            traits: &traits,
            associated_memories: &[],
            platform: Some("twitter"),
            environment: &env,
            narrative_seed: "seed",
        };
        let text = build(DirectiveShape::Batch, &ctx);
        assert!(text.contains("Emotional state: excited"));
        assert!(text.contains("Narrative mode: technical"));
        assert!(!text.contains("twitter"));
        assert!(!text.contains(BATCH_SENTINEL));
    }
}
