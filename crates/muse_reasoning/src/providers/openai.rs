use anyhow::{Context, Result};
use async_trait::async_trait;
use muse_core::config::LlmConfig;
use muse_core::{Environment, GenerationError, PersonalityState};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

use crate::llm::TextGenerator;

/// Any OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let base_url = config
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .context("Failed to build HTTP client")?,
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

/// Map a non-success HTTP status to the generator error taxonomy.
pub fn classify_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> GenerationError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited {
            retry_after: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::AuthFailed(snippet),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GenerationError::Timeout(Duration::ZERO)
        }
        StatusCode::NOT_FOUND => GenerationError::ModelUnavailable(snippet),
        s if s.is_server_error() => GenerationError::ModelUnavailable(format!("{}: {}", s, snippet)),
        s => GenerationError::Unknown(format!("{}: {}", s, snippet)),
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        directive: &str,
        _state: &PersonalityState,
        _environment: &Environment,
    ) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::AuthFailed("OPENAI_API_KEY is not set".into()));
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": directive },
                { "role": "user", "content": "Respond now, in character." }
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(Duration::from_secs(60))
                } else if e.is_connect() {
                    GenerationError::ModelUnavailable(e.to_string())
                } else {
                    GenerationError::Unknown(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("OpenAI returned {}", status);
            return Err(classify_status(status, retry_after.as_deref(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Unknown(format!("invalid response body: {}", e)))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Unknown("response has no message content".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some("12"), ""),
            GenerationError::RateLimited {
                retry_after: Some(Duration::from_secs(12))
            }
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some("soon"), ""),
            GenerationError::RateLimited { retry_after: None }
        );
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, None, "bad key"),
            GenerationError::AuthFailed(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, None, ""),
            GenerationError::ModelUnavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, None, "nope"),
            GenerationError::Unknown(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_failure() {
        let mut generator = OpenAiGenerator::new(&LlmConfig::default()).unwrap();
        generator.api_key.clear();
        let err = generator
            .generate("hi", &PersonalityState::default(), &Environment::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::AuthFailed(_)));
    }
}
