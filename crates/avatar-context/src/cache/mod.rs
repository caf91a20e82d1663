//! Context cache
//!
//! - `key`: deterministic fingerprints for cache entries
//! - `context_cache`: LRU cache with TTL and hit-rate accounting

pub mod context_cache;
pub mod key;


use thiserror::Error;

pub use context_cache::{CacheEntry, CacheLookup, CacheStats, ContextCache};
pub use key::{CacheKey, CURRENT_SCOPE};

/// Errors from the cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store is disabled or has been released
    #[error("Cache is unavailable")]
    Unavailable,

    #[error("Failed to serialize cache entry: {0}")]
    Serialization(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
