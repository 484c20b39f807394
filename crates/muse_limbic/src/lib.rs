//! # Muse Limbic System
//!
//! Turns raw stimulus text into an [`EmotionalResponse`](muse_core::EmotionalResponse).
//!
//! Classification is cheap and synchronous: a lexicon scan, an optional
//! momentum transition driven by the previous response, and an intensity
//! derived from the resulting state. The machine keeps a short FIFO history
//! of its own outputs, which is the only thing momentum looks at.

pub mod intensity;
mod machine;

pub use machine::EmotionalStateMachine;
