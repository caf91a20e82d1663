//! Context compression
//!
//! - `compressor`: size-triggered, importance-based message pruning
//! - `summarizer`: context summaries, key points, emotional arcs and action items

pub mod compressor;
pub mod summarizer;
pub mod types;

#[cfg(test)]
mod compressor_property_tests;

pub use compressor::ContextCompressor;
pub use summarizer::{emotional_arc, extract_action_items, extract_key_points, summarize_context};
pub use types::{
    ArcTrend, CompressionMetadata, CompressionResult, ConversationSummary, EmotionalArc,
    EmotionalPeak,
};
