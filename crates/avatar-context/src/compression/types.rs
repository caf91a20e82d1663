//! Compression and summarization result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Context, Emotion};

// ============================================================================
// Context Compression
// ============================================================================

/// Bookkeeping for one compression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetadata {
    /// Whether any message was pruned
    pub compressed: bool,
    /// Size threshold in effect, in bytes
    pub threshold: usize,
    pub original_message_count: usize,
    pub retained_message_count: usize,
    /// Share of total message importance carried by the retained messages
    pub importance_retained: f64,
    /// Whether `importance_retained` met the configured quality threshold
    pub quality_met: bool,
    pub compressed_at: DateTime<Utc>,
}

/// Output of [`ContextCompressor::compress_context`](super::ContextCompressor::compress_context).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    /// Serialized size of the three layers before compression
    pub original_size: usize,
    /// Serialized size after compression, never above `original_size`
    pub compressed_size: usize,
    /// `compressed_size / original_size`; 1.0 when nothing was done
    pub compression_ratio: f64,
    pub summary: String,
    pub key_points: Vec<String>,
    /// Retained messages in their original order
    pub retained_messages: Vec<ChatMessage>,
    pub metadata: CompressionMetadata,
}

impl CompressionResult {
    /// Build a no-op result that keeps every message.
    pub fn unchanged(context: &Context, size: usize, threshold: usize, summary: String) -> Self {
        let count = context.immediate.recent_messages.len();
        Self {
            original_size: size,
            compressed_size: size,
            compression_ratio: 1.0,
            summary,
            key_points: Vec::new(),
            retained_messages: context.immediate.recent_messages.clone(),
            metadata: CompressionMetadata {
                compressed: false,
                threshold,
                original_message_count: count,
                retained_message_count: count,
                importance_retained: 1.0,
                quality_met: true,
                compressed_at: Utc::now(),
            },
        }
    }

    /// A copy of `context` with only the retained messages.
    pub fn apply_to(&self, context: &Context) -> Context {
        let mut compacted = context.clone();
        compacted.immediate.recent_messages = self.retained_messages.clone();
        compacted
    }
}

// ============================================================================
// Conversation Summaries
// ============================================================================

/// Overall direction of an emotional arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArcTrend {
    Positive,
    Negative,
    #[default]
    Neutral,
    Mixed,
}

/// A message whose emotional intensity stood out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalPeak {
    pub message_id: String,
    pub position: usize,
    pub emotion: Emotion,
    pub intensity: f64,
}

/// How the user's emotions moved across a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmotionalArc {
    pub start_emotion: Emotion,
    pub end_emotion: Emotion,
    pub peaks: Vec<EmotionalPeak>,
    pub trend: ArcTrend,
}

/// Summary of a message sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationSummary {
    pub message_count: usize,
    pub user_message_count: usize,
    pub summary: String,
    pub topics: Vec<String>,
    pub emotional_arc: EmotionalArc,
    pub action_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}
