//! # Muse Expression
//!
//! Picks the narrative register for each turn and fills a short seed text for
//! it. The seed is handed to the directive builder; it is never shown to the
//! user verbatim.

pub mod narrative;
pub mod templates;

pub use narrative::{NarrativeEntry, NarrativeModeSelector};
