use anyhow::Result;
use async_trait::async_trait;
use muse_core::config::LlmConfig;
use muse_core::{Environment, GenerationError, PersonalityState};
use std::sync::Arc;

/// The external text generator: directive in, free text out.
///
/// Implementations must not retry internally; transient failures are reported
/// with a retryable [`GenerationError`] and the caller decides.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        directive: &str,
        state: &PersonalityState,
        environment: &Environment,
    ) -> Result<String, GenerationError>;

    fn name(&self) -> &str {
        "generator"
    }
}

/// Build the generator named by `config.provider`.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(crate::providers::MockGenerator::new(&config.model))),
        "openai" => Ok(Arc::new(crate::providers::OpenAiGenerator::new(config)?)),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_generator() {
        let mut config = LlmConfig::default();
        assert_eq!(create_generator(&config).unwrap().name(), "mock");

        config.provider = "openai".into();
        assert_eq!(create_generator(&config).unwrap().name(), "openai");

        config.provider = "carrier-pigeon".into();
        assert!(create_generator(&config).is_err());
    }
}
