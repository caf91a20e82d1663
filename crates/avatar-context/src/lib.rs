//! Avatar Context - conversational context management for 3D avatar chat
//!
//! This crate builds a layered context (system, session, immediate) for
//! every chat message, remembers what matters across three memory tiers,
//! scores the user's emotional state, keeps contexts under a size budget
//! and validates them before response generation.

pub mod cache;
pub mod compression;
pub mod config;
pub mod emotion;
pub mod feedback;
pub mod logging;
pub mod manager;
pub mod memory;
pub mod text;
pub mod topics;
pub mod types;
pub mod validation;

pub use cache::{CacheError, CacheKey, CacheStats, ContextCache};
pub use compression::{CompressionResult, ContextCompressor, ConversationSummary};
pub use config::{ConfigError, ContextSystemConfig};
pub use emotion::{EmotionScorer, EmotionalAnalysis, EmotionalAnalyzer, KeywordEmotionScorer};
pub use feedback::{FeedbackCategory, FeedbackStore, PersonalityAdjustment};
pub use manager::{ContextAnalysis, ContextManager, ContextStats, ListenerId};
pub use memory::{MemoryError, MemoryStore, RelevantMemories};
pub use types::{
    ChatMessage, Context, ContextError, ContextEvent, ContextEventType, ContextResult, Emotion,
    ProfileUpdate, Sender,
};
pub use validation::{ContextValidator, HealthReport, ValidationResult};
