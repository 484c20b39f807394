pub mod directive;
pub mod engine;
pub mod llm;
pub mod personality;
pub mod providers;
pub mod retry;

pub use directive::DirectiveShape;
pub use engine::{EngineSnapshot, MuseEngine, PendingTurn, TurnOutcome, TurnRequest};
pub use llm::TextGenerator;
pub use personality::PersonalityCore;
