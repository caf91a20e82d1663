//! Tiered memory
//!
//! - `short_term`: ring buffers of recent messages and contexts
//! - `long_term`: user profile, significant interactions, learned preferences
//! - `working`: current context, active processes and scratch data
//! - `store`: the [`MemoryStore`] owning all three tiers

pub mod long_term;
pub mod short_term;
pub mod store;
pub mod types;
pub mod working;

use thiserror::Error;

pub use long_term::{extract_preferences, LongTermMemory, PreferenceStatement};
pub use short_term::ShortTermMemory;
pub use store::MemoryStore;
pub use types::{
    ActiveProcess, LearnedPreference, MemoryStats, MemoryUpdate, PreferencePolarity,
    ProcessStatus, RelevantMemories, SignificantInteraction, TierUtilization,
};
pub use working::WorkingMemory;

/// Errors from the memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Working memory is full ({capacity} slots)")]
    WorkingMemoryFull { capacity: usize },

    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

/// Result type for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;
