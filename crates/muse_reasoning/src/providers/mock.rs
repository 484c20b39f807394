//! Mock generator — deterministic responses for running without API keys.

use async_trait::async_trait;
use muse_core::{Environment, GenerationError, PersonalityState};

use crate::llm::TextGenerator;

#[derive(Debug, Clone)]
pub struct MockGenerator {
    model: String,
}

impl MockGenerator {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        directive: &str,
        state: &PersonalityState,
        _environment: &Environment,
    ) -> Result<String, GenerationError> {
        let stimulus = directive
            .lines()
            .rev()
            .find_map(|l| l.strip_prefix("Stimulus: "))
            .unwrap_or("the void");
        Ok(format!(
            "(Mock {} response) Feeling {} in {} mode about: {}",
            self.model,
            state.emotional_state(),
            state.narrative_mode,
            stimulus
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
