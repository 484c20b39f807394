pub mod config;
pub mod error;
pub mod profile;
pub mod rng;
pub mod state;
pub mod text;
pub mod trait_vector;
pub mod types;

pub use config::MuseConfig;
pub use error::{
    ConsolidationError, GenerationError, PersistenceError, TurnError, ValidationError,
};
pub use profile::{EmotionalProfile, TransitionTable, TriggerTable};
pub use state::{Consciousness, Environment, InteractionContext, PersonalityState};
pub use trait_vector::TraitVector;
pub use types::{
    CommunicationStyle, EmotionalResponse, EmotionalState, Memory, MemoryKind, MemoryStatus,
    NarrativeMode, Pattern,
};

use async_trait::async_trait;
use uuid::Uuid;

/// Durable mirror of the memory tiers.
///
/// The engine only ever uses this to rehydrate at startup, mirror each memory
/// write, and flag consolidated or expired records as archived. Every failure is
/// non-fatal to the caller: the in-memory tiers stay authoritative.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn insert(&self, memory: &Memory) -> Result<(), PersistenceError>;

    /// All records whose status is still `Active`.
    async fn query_active(&self) -> Result<Vec<Memory>, PersistenceError>;

    async fn update_status(&self, id: Uuid, status: MemoryStatus)
        -> Result<(), PersistenceError>;

    /// Pattern mirroring is optional; stores that don't track patterns keep the defaults.
    async fn upsert_pattern(&self, _pattern: &Pattern) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn query_patterns(&self) -> Result<Vec<Pattern>, PersistenceError> {
        Ok(Vec::new())
    }
}
