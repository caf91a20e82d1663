//! LRU cache of assembled contexts.
//!
//! Backed by `lru::LruCache` (hash map + doubly linked list). On top of the
//! plain LRU it tracks:
//!
//! - hit/miss counters for the lifetime of the cache (not reset on eviction)
//! - per-entry last-access time and access count
//! - a TTL after which entries are dropped on access
//! - an estimate of memory usage (serialized size of cached contexts)
//!
//! A disabled cache models an unavailable backing store: reads and writes
//! return [`CacheError::Unavailable`] and callers are expected to treat that
//! exactly like a miss.

use std::num::NonZeroUsize;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CacheError, CacheResult};
use crate::config::CacheConfig;
use crate::types::Context;

/// A cached context with LRU bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub context: Context,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub size_bytes: usize,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Box<Context>),
    Miss,
    /// The entry existed but outlived its TTL and was removed
    Expired,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// hits / total_access over the cache's lifetime
    pub hit_rate: f64,
    pub total_access: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired_count: u64,
    /// Serialized bytes held by cached contexts
    pub memory_usage: usize,
}

/// LRU cache of contexts keyed by fingerprint.
pub struct ContextCache {
    entries: LruCache<String, CacheEntry>,
    max_size: usize,
    ttl: Option<Duration>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expired_count: u64,
    memory_usage: usize,
    available: bool,
}

impl ContextCache {
    /// Create a cache. A `ttl_secs` of 0 disables expiry.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        let ttl = (config.ttl_secs > 0)
            .then(|| Duration::seconds(i64::try_from(config.ttl_secs).unwrap_or(i64::MAX)));
        Self {
            entries: LruCache::new(capacity),
            max_size: capacity.get(),
            ttl,
            hits: 0,
            misses: 0,
            evictions: 0,
            expired_count: 0,
            memory_usage: 0,
            available: true,
        }
    }

    /// Insert or replace a context, evicting the least recently used entry
    /// when the cache is full.
    pub fn set(&mut self, key: impl Into<String>, context: Context) -> CacheResult<()> {
        self.ensure_available()?;
        let key = key.into();
        let size_bytes = serde_json::to_vec(&context)
            .map_err(|e| CacheError::Serialization(e.to_string()))?
            .len();
        let now = Utc::now();
        let entry = CacheEntry {
            context,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            size_bytes,
        };

        self.memory_usage += size_bytes;
        if let Some((old_key, old_entry)) = self.entries.push(key.clone(), entry) {
            self.memory_usage = self.memory_usage.saturating_sub(old_entry.size_bytes);
            if old_key != key {
                self.evictions += 1;
                debug!("Evicted least recently used context {}", short(&old_key));
            }
        }
        Ok(())
    }

    /// Fetch a context; `Ok(None)` on miss or expiry.
    pub fn get(&mut self, key: &str) -> CacheResult<Option<Context>> {
        Ok(match self.lookup(key)? {
            CacheLookup::Hit(context) => Some(*context),
            CacheLookup::Miss | CacheLookup::Expired => None,
        })
    }

    /// Fetch a context, distinguishing misses from expired entries.
    pub fn lookup(&mut self, key: &str) -> CacheResult<CacheLookup> {
        self.lookup_at(key, Utc::now())
    }

    /// [`lookup`](Self::lookup) evaluated at a given instant.
    pub fn lookup_at(&mut self, key: &str, now: DateTime<Utc>) -> CacheResult<CacheLookup> {
        self.ensure_available()?;

        let expired = self
            .entries
            .peek(key)
            .map(|entry| self.is_expired(entry, now));
        let Some(expired) = expired else {
            self.misses += 1;
            debug!("Cache miss for {}", short(key));
            return Ok(CacheLookup::Miss);
        };

        if expired {
            if let Some(entry) = self.entries.pop(key) {
                self.memory_usage = self.memory_usage.saturating_sub(entry.size_bytes);
            }
            self.misses += 1;
            self.expired_count += 1;
            debug!("Cache entry {} expired", short(key));
            return Ok(CacheLookup::Expired);
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                entry.access_count += 1;
                self.hits += 1;
                debug!("Cache hit for {}", short(key));
                Ok(CacheLookup::Hit(Box::new(entry.context.clone())))
            }
            None => {
                self.misses += 1;
                Ok(CacheLookup::Miss)
            }
        }
    }

    /// Whether a live entry exists. Does not touch LRU order or counters.
    pub fn has(&self, key: &str) -> bool {
        self.available
            && self
                .entries
                .peek(key)
                .is_some_and(|entry| !self.is_expired(entry, Utc::now()))
    }

    /// Remove an entry, returning whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.memory_usage = self.memory_usage.saturating_sub(entry.size_bytes);
                true
            }
            None => false,
        }
    }

    /// Drop every entry. Lifetime counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.memory_usage = 0;
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn prune_expired(&mut self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(entry) = self.entries.pop(key) {
                self.memory_usage = self.memory_usage.saturating_sub(entry.size_bytes);
            }
        }
        self.expired_count += expired.len() as u64;
        expired.len()
    }

    /// Entry metadata without promoting it.
    pub fn peek_entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    pub fn stats(&self) -> CacheStats {
        let total_access = self.hits + self.misses;
        let hit_rate = if total_access > 0 {
            self.hits as f64 / total_access as f64
        } else {
            0.0
        };
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hit_rate,
            total_access,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expired_count: self.expired_count,
            memory_usage: self.memory_usage,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark the backing store unavailable.
    pub fn disable(&mut self) {
        self.available = false;
    }

    pub fn enable(&mut self) {
        self.available = true;
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn ensure_available(&self) -> CacheResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        self.ttl
            .is_some_and(|ttl| now.signed_duration_since(entry.created_at) > ttl)
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ContextSystemConfig;
    use crate::types::{
        ConversationFlow, EnvironmentInfo, Emotion, ImmediateContext, SessionContext, UserProfile,
    };

    pub(crate) fn sample_context(id: &str) -> Context {
        let config = ContextSystemConfig::default();
        let now = Utc::now();
        Context {
            id: id.to_string(),
            timestamp: now,
            system: config.system_context(),
            session: SessionContext {
                session_id: "session-1".to_string(),
                user_profile: UserProfile::default(),
                objectives: Vec::new(),
                themes: Vec::new(),
                start_time: now,
                message_count: 0,
            },
            immediate: ImmediateContext {
                recent_messages: Vec::new(),
                current_emotion: Emotion::Neutral,
                flow: ConversationFlow::default(),
                active_topics: Vec::new(),
                environment: EnvironmentInfo {
                    timezone: "UTC".to_string(),
                    ..Default::default()
                },
            },
        }
    }

    fn cache_with(max_size: usize, ttl_secs: u64) -> ContextCache {
        ContextCache::new(&CacheConfig { max_size, ttl_secs })
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut cache = cache_with(4, 0);
        cache.set("k", sample_context("ctx-1")).unwrap();
        let fetched = cache.get("k").unwrap().unwrap();
        assert_eq!(fetched.id, "ctx-1");
        assert!(cache.has("k"));
    }

    #[test]
    fn test_miss_counts_toward_total_access() {
        let mut cache = cache_with(4, 0);
        assert!(cache.get("missing").unwrap().is_none());
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_access, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let mut cache = cache_with(2, 0);
        cache.set("a", sample_context("a")).unwrap();
        cache.set("b", sample_context("b")).unwrap();
        // Touch "a" so "b" becomes least recently used
        cache.get("a").unwrap();
        cache.set("c", sample_context("c")).unwrap();

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replacing_key_is_not_an_eviction() {
        let mut cache = cache_with(2, 0);
        cache.set("a", sample_context("a1")).unwrap();
        let usage_before = cache.stats().memory_usage;
        cache.set("a", sample_context("a2")).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.memory_usage, usage_before);
        assert_eq!(cache.get("a").unwrap().unwrap().id, "a2");
    }

    #[test]
    fn test_hit_rate_survives_eviction() {
        let mut cache = cache_with(1, 0);
        cache.set("a", sample_context("a")).unwrap();
        cache.get("a").unwrap();
        cache.set("b", sample_context("b")).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate, 1.0);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let mut cache = cache_with(4, 1);
        cache.set("a", sample_context("a")).unwrap();

        let later = Utc::now() + Duration::seconds(5);
        assert_eq!(cache.lookup_at("a", later).unwrap(), CacheLookup::Expired);
        assert_eq!(cache.stats().expired_count, 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().memory_usage, 0);
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = cache_with(4, 0);
        cache.set("a", sample_context("a")).unwrap();
        cache.set("b", sample_context("b")).unwrap();

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().memory_usage, 0);
    }

    #[test]
    fn test_disabled_cache_reports_unavailable() {
        let mut cache = cache_with(4, 0);
        cache.disable();
        assert!(matches!(
            cache.set("a", sample_context("a")),
            Err(CacheError::Unavailable)
        ));
        assert!(matches!(cache.get("a"), Err(CacheError::Unavailable)));
        assert!(!cache.has("a"));

        cache.enable();
        assert!(cache.set("a", sample_context("a")).is_ok());
    }

    #[test]
    fn test_access_count_tracked() {
        let mut cache = cache_with(4, 0);
        cache.set("a", sample_context("a")).unwrap();
        cache.get("a").unwrap();
        cache.get("a").unwrap();
        assert_eq!(cache.peek_entry("a").unwrap().access_count, 2);
    }
}
