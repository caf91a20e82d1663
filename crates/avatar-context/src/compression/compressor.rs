//! Context Compressor Module
//!
//! Keeps contexts under a size budget by pruning the immediate layer's
//! recent messages down to the most important ones.
//!
//! - Size is the serialized byte length of the three context layers
//! - Contexts at or under `compression_threshold` are returned untouched
//! - Otherwise every recent message gets an importance score and the top
//!   `retention_period` messages are kept, in their original order
//!
//! # Example
//!
//! ```rust,ignore
//! use avatar_context::compression::ContextCompressor;
//!
//! let compressor = ContextCompressor::new(config.compression.clone(), scorer);
//! if compressor.should_compress(&context) {
//!     let result = compressor.compress_context(&context);
//!     let compacted = result.apply_to(&context);
//! }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::CompressionConfig;
use crate::emotion::EmotionScorer;
use crate::types::{clamp_unit, layer_size, ChatMessage, Context};

use super::summarizer::{extract_key_points, summarize_conversation, summarize_context};
use super::types::{CompressionMetadata, CompressionResult, ConversationSummary};

// ============================================================================
// Constants
// ============================================================================

/// Message length (chars) that counts as full length
const LENGTH_NORMALIZER: f64 = 200.0;

/// Importance term weights
const LENGTH_WEIGHT: f64 = 0.3;
const QUESTION_WEIGHT: f64 = 0.4;
const DENSITY_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;

/// Sum of the importance weights, used to keep scores in `[0, 1]`
const WEIGHT_TOTAL: f64 = LENGTH_WEIGHT + QUESTION_WEIGHT + DENSITY_WEIGHT + RECENCY_WEIGHT;

const UNDER_THRESHOLD_SUMMARY: &str =
    "No compression applied: context is within the size threshold.";
const NOT_SMALLER_SUMMARY: &str =
    "No compression applied: pruning would not reduce the context size.";

// ============================================================================
// ContextCompressor
// ============================================================================

/// Size-triggered context compressor.
pub struct ContextCompressor {
    config: CompressionConfig,
    scorer: Arc<dyn EmotionScorer>,
}

impl ContextCompressor {
    pub fn new(config: CompressionConfig, scorer: Arc<dyn EmotionScorer>) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Whether the context is over the size threshold.
    pub fn should_compress(&self, context: &Context) -> bool {
        context.layer_size() > self.config.compression_threshold
    }

    /// Compress a context.
    ///
    /// Returns a no-op result (ratio 1.0, every message retained) when the
    /// context is within the threshold, or when pruning would not make it
    /// smaller, so `compressed_size <= original_size` always holds.
    ///
    /// # Arguments
    ///
    /// * `context` - The context to compress; it is not modified
    ///
    /// # Returns
    ///
    /// The compression result. Use [`CompressionResult::apply_to`] to build
    /// the compacted context.
    pub fn compress_context(&self, context: &Context) -> CompressionResult {
        let threshold = self.config.compression_threshold;
        let original_size = context.layer_size();
        if original_size <= threshold {
            return CompressionResult::unchanged(
                context,
                original_size,
                threshold,
                UNDER_THRESHOLD_SUMMARY.to_string(),
            );
        }

        let messages = &context.immediate.recent_messages;
        let total = messages.len();
        let scores: Vec<f64> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| self.score_message_importance(m, i, total))
            .collect();

        // Highest score first; equal scores prefer the more recent message
        let mut ranked: Vec<usize> = (0..total).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(b.cmp(&a)));
        let mut kept: Vec<usize> = ranked
            .into_iter()
            .take(self.config.retention_period.min(total))
            .collect();
        kept.sort_unstable();

        let retained_messages: Vec<ChatMessage> =
            kept.iter().map(|&i| messages[i].clone()).collect();

        let mut immediate = context.immediate.clone();
        immediate.recent_messages = retained_messages.clone();
        let compressed_size = layer_size(&context.system, &context.session, &immediate);
        if compressed_size >= original_size {
            return CompressionResult::unchanged(
                context,
                original_size,
                threshold,
                NOT_SMALLER_SUMMARY.to_string(),
            );
        }

        let total_importance: f64 = scores.iter().sum();
        let retained_importance: f64 = kept.iter().map(|&i| scores[i]).sum();
        let importance_retained = if total_importance > 0.0 {
            clamp_unit(retained_importance / total_importance)
        } else {
            1.0
        };
        let quality_met = importance_retained >= self.config.quality_threshold;
        if !quality_met {
            debug!(
                "Compression kept {:.0}% of message importance (target {:.0}%)",
                importance_retained * 100.0,
                self.config.quality_threshold * 100.0
            );
        }

        let compression_ratio = compressed_size as f64 / original_size as f64;
        debug!(
            "Compressed context {}: {} -> {} bytes, {} -> {} messages",
            context.id,
            original_size,
            compressed_size,
            total,
            retained_messages.len()
        );

        CompressionResult {
            original_size,
            compressed_size,
            compression_ratio,
            summary: summarize_context(context),
            key_points: extract_key_points(context),
            metadata: CompressionMetadata {
                compressed: true,
                threshold,
                original_message_count: total,
                retained_message_count: retained_messages.len(),
                importance_retained,
                quality_met,
                compressed_at: chrono::Utc::now(),
            },
            retained_messages,
        }
    }

    /// Importance of one message within a sequence.
    ///
    /// `0.3 * length + 0.4 * question + 0.3 * emotional density + 0.2 * recency`,
    /// divided by the weight total so the score stays in `[0, 1]`. Length is
    /// normalized against 200 characters; recency is `(position + 1) / total`.
    pub fn score_message_importance(
        &self,
        message: &ChatMessage,
        position: usize,
        total: usize,
    ) -> f64 {
        let length = (message.content.chars().count() as f64 / LENGTH_NORMALIZER).min(1.0);
        let question = if message.content.contains('?') { 1.0 } else { 0.0 };
        let density = self.scorer.emotional_density(&message.content);
        let recency = if total == 0 {
            0.0
        } else {
            clamp_unit((position + 1) as f64 / total as f64)
        };

        clamp_unit(
            (LENGTH_WEIGHT * length
                + QUESTION_WEIGHT * question
                + DENSITY_WEIGHT * density
                + RECENCY_WEIGHT * recency)
                / WEIGHT_TOTAL,
        )
    }

    /// Summarize a message list with an emotional arc and action items.
    pub fn summarize_conversation(&self, messages: &[ChatMessage]) -> ConversationSummary {
        summarize_conversation(messages, self.scorer.as_ref())
    }
}
