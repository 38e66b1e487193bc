//! Aggregate statistics: model, storage trait, persistence

pub mod store;

pub use store::{AggregateStats, FileStore, MatchSummary, MemoryStore, StatsHandle, StatsStore};
