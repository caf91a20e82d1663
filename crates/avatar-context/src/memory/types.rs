//! Memory tier records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Emotion};

/// A message remembered for its emotional or topical impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantInteraction {
    pub id: String,
    /// Id of the message that triggered the record
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    /// `0.6 * intensity + 0.4 * confidence`
    pub impact: f64,
    pub emotional_resonance: Emotion,
    pub topics: Vec<String>,
}

/// Whether a learned preference is a like or a dislike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferencePolarity {
    Like,
    Dislike,
}

/// A preference inferred from what the user said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPreference {
    /// Topic the value belongs to, or "general"
    pub category: String,
    pub value: String,
    pub polarity: PreferencePolarity,
    pub confidence: f64,
    /// Statements supporting the preference, newest last
    pub evidence: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// Lifecycle of a working-memory process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    Running,
    Waiting,
    Completed,
    Failed,
}

impl ProcessStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, ProcessStatus::Completed | ProcessStatus::Failed)
    }
}

/// An in-flight unit of work tracked in working memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveProcess {
    pub id: String,
    pub process_type: String,
    pub status: ProcessStatus,
    /// Progress in `[0, 1]`
    pub progress: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a memory query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevantMemories {
    pub recent_messages: Vec<ChatMessage>,
    pub significant_interactions: Vec<SignificantInteraction>,
    pub learned_preferences: Vec<LearnedPreference>,
    /// Blended recency, topical overlap and emotional salience, in `[0, 1]`
    pub relevance_score: f64,
}

/// Count vs capacity for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierUtilization {
    pub count: usize,
    pub capacity: usize,
    pub utilization: f64,
}

impl TierUtilization {
    pub fn new(count: usize, capacity: usize) -> Self {
        let utilization = if capacity == 0 {
            0.0
        } else {
            (count as f64 / capacity as f64).min(1.0)
        };
        Self {
            count,
            capacity,
            utilization,
        }
    }
}

/// Memory statistics across tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub short_term: TierUtilization,
    pub long_term: TierUtilization,
    pub working: TierUtilization,
    pub recent_contexts: usize,
    pub learned_preferences: usize,
    pub active_processes: usize,
    /// Approximate serialized size of everything held, in bytes
    pub memory_usage: usize,
}

/// What a single `process_message` call changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub short_term_evicted: bool,
    pub significant: bool,
    pub preferences_learned: usize,
}
