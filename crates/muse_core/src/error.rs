//! Error taxonomy.
//!
//! Only [`TurnError`] (validation or generation failures) ever reaches a caller.
//! Persistence and consolidation errors are logged by whoever hits them and the
//! engine keeps running on its in-memory state.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Malformed input; the turn is aborted before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("input text too long: {length} chars exceeds limit of {limit}")]
    InputTooLong { length: usize, limit: usize },

    #[error("memory content is empty")]
    EmptyContent,

    #[error("unknown {kind}: {value:?}")]
    UnknownTag { kind: &'static str, value: String },
}

/// Failure of the external text generator. Never retried inside the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generator rate limited{}", .retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    #[error("generator rejected credentials: {0}")]
    AuthFailed(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("generation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("generation failed: {0}")]
    Unknown(String),
}

impl GenerationError {
    /// Whether a caller may reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited { .. }
                | GenerationError::ModelUnavailable(_)
                | GenerationError::Timeout(_)
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GenerationError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// What a caller of `process_turn` can observe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl TurnError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TurnError::Validation(_) => false,
            TurnError::Generation(e) => e.is_retryable(),
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TurnError::Validation(_) => None,
            TurnError::Generation(e) => e.retry_after(),
        }
    }
}

/// Durable mirror failure. Logged, never surfaced.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {id}")]
    NotFound { id: Uuid },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A consolidation sweep that had to be abandoned before committing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationError {
    #[error("memory {id} present in both tiers, sweep abandoned")]
    TierConflict { id: Uuid },
}
