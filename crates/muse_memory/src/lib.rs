//! # Muse Memory
//!
//! Two in-process tiers plus an optional durable mirror:
//!
//! - **STM**: bounded FIFO of fresh records, oldest dropped on overflow.
//! - **LTM**: records promoted by [`MemoryStore::consolidate`], bounded by
//!   importance (the least important are evicted first).
//!
//! The tiers are authoritative. Every write is also queued to a single
//! background writer that applies it to a [`DurableStore`](muse_core::DurableStore);
//! failures there are logged and never reach the caller.

pub mod durable;
pub mod patterns;
pub mod schedule;
pub mod sqlite;
mod store;

pub use durable::InMemoryDurableStore;
pub use patterns::PatternMiner;
pub use sqlite::SqliteDurableStore;
pub use store::{ConsolidationReport, MemoryQuery, MemoryStats, MemoryStore};
