//! Core type definitions for the avatar context system.
//!
//! A [`Context`] is a layered snapshot built once per chat message:
//!
//! - [`SystemContext`]: avatar personality, conversation guidelines and
//!   technical limits
//! - [`SessionContext`]: who the user is and what this conversation is about
//! - [`ImmediateContext`]: the last few messages, the detected emotion and the
//!   state of the conversation flow
//!
//! All scalar scores (confidence, intensity, relevance, ratios) are kept in
//! `[0, 1]`; constructors and builders clamp with [`clamp_unit`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::feedback::FeedbackError;
use crate::memory::MemoryError;

/// Clamp a score into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur inside the context pipeline.
///
/// None of these escape the public [`ContextManager`](crate::ContextManager)
/// API; they are logged, reported as `error_occurred` events and replaced
/// with a degraded context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Cache backend failure
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Memory store failure
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Configuration failure
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Rejected feedback
    #[error("Feedback error: {0}")]
    Feedback(#[from] FeedbackError),

    /// The inbound message cannot be processed
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The manager was destroyed
    #[error("Context manager has been destroyed")]
    Destroyed,
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        ContextError::Serialization(err.to_string())
    }
}

/// Result type for context operations
pub type ContextResult<T> = std::result::Result<T, ContextError>;

// ============================================================================
// Chat Messages
// ============================================================================

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// A single chat message handed in by the chat UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Message text
    pub content: String,
    /// Author of the message
    pub sender: Sender,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
    /// Opaque metadata supplied by the UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ChatMessage {
    /// Create a message with a fresh id and the current time.
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Shorthand for a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    /// Shorthand for an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }

    /// Override the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach opaque metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

// ============================================================================
// Emotions
// ============================================================================

/// Emotions the avatar can detect in user text.
///
/// The first eight are the stable states; `Anxious`, `Angry` and `Grateful`
/// are transient states that usually decay back within a few turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Excited,
    Calm,
    Frustrated,
    Confused,
    Curious,
    #[default]
    Neutral,
    Anxious,
    Angry,
    Grateful,
}

impl Emotion {
    /// Every emotion, in declaration order.
    pub const ALL: [Emotion; 11] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Excited,
        Emotion::Calm,
        Emotion::Frustrated,
        Emotion::Confused,
        Emotion::Curious,
        Emotion::Neutral,
        Emotion::Anxious,
        Emotion::Angry,
        Emotion::Grateful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Excited => "excited",
            Emotion::Calm => "calm",
            Emotion::Frustrated => "frustrated",
            Emotion::Confused => "confused",
            Emotion::Curious => "curious",
            Emotion::Neutral => "neutral",
            Emotion::Anxious => "anxious",
            Emotion::Angry => "angry",
            Emotion::Grateful => "grateful",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            Emotion::Happy | Emotion::Excited | Emotion::Calm | Emotion::Grateful
        )
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Emotion::Sad | Emotion::Frustrated | Emotion::Anxious | Emotion::Angry
        )
    }

    /// Whether the state is one of the short-lived ones.
    pub fn is_transient(&self) -> bool {
        matches!(self, Emotion::Anxious | Emotion::Angry | Emotion::Grateful)
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// System Layer
// ============================================================================

/// Avatar personality on 0-1 scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityTraits {
    pub warmth: f64,
    pub energy: f64,
    pub formality: f64,
    pub empathy: f64,
    pub humor: f64,
    pub curiosity: f64,
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self {
            warmth: 0.8,
            energy: 0.6,
            formality: 0.3,
            empathy: 0.8,
            humor: 0.5,
            curiosity: 0.7,
        }
    }
}

impl PersonalityTraits {
    /// Name/value pairs, used by validation and reporting.
    pub fn as_pairs(&self) -> [(&'static str, f64); 6] {
        [
            ("warmth", self.warmth),
            ("energy", self.energy),
            ("formality", self.formality),
            ("empathy", self.empathy),
            ("humor", self.humor),
            ("curiosity", self.curiosity),
        ]
    }
}

/// How much each memory tier counts when assembling a response.
///
/// Conceptually `immediate > recent > session > historical`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub immediate: f64,
    pub recent: f64,
    pub session: f64,
    pub historical: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            immediate: 1.0,
            recent: 0.8,
            session: 0.6,
            historical: 0.4,
        }
    }
}

/// Conversation guidelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationGuidelines {
    /// Number of recent messages kept in the immediate layer
    pub context_window: usize,
    pub priority_weights: PriorityWeights,
}

/// Per-tier memory capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCapacity {
    pub short_term: usize,
    pub long_term: usize,
    pub working_memory: usize,
}

/// Technical capability limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalLimits {
    pub max_tokens: usize,
    pub cache_size: usize,
    pub memory_capacity: MemoryCapacity,
}

/// The static-ish configuration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    pub personality: PersonalityTraits,
    pub guidelines: ConversationGuidelines,
    pub limits: TechnicalLimits,
}

// ============================================================================
// Session Layer
// ============================================================================

/// Preferred answer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Brief,
    #[default]
    Moderate,
    Detailed,
}

/// Preferred communication style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationStyle {
    #[default]
    Casual,
    Formal,
    Playful,
    Supportive,
}

/// Explicit user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserPreferences {
    pub response_length: ResponseLength,
    pub language: Option<String>,
    pub voice_enabled: bool,
    pub animations_enabled: bool,
}

/// Aggregated interaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InteractionHistory {
    pub total_messages: u64,
    pub first_interaction: Option<DateTime<Utc>>,
    pub last_interaction: Option<DateTime<Utc>>,
    /// Running average sentiment; 0.5 is neutral
    pub average_sentiment: f64,
}

/// Durable-for-session user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub preferences: UserPreferences,
    pub communication_style: CommunicationStyle,
    pub topic_interests: Vec<String>,
    pub interaction_history: InteractionHistory,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            name: None,
            preferences: UserPreferences::default(),
            communication_style: CommunicationStyle::default(),
            topic_interests: Vec::new(),
            interaction_history: InteractionHistory {
                average_sentiment: 0.5,
                ..Default::default()
            },
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub communication_style: Option<CommunicationStyle>,
    pub topic_interests: Option<Vec<String>>,
}

impl UserProfile {
    /// Merge a partial update into the profile.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(user_id) = update.user_id {
            self.user_id = user_id;
        }
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(preferences) = update.preferences {
            self.preferences = preferences;
        }
        if let Some(style) = update.communication_style {
            self.communication_style = style;
        }
        if let Some(interests) = update.topic_interests {
            self.topic_interests = interests;
        }
    }
}

/// A recurring topic of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTheme {
    pub topic: String,
    pub confidence: f64,
    pub frequency: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// The per-conversation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub user_profile: UserProfile,
    pub objectives: Vec<String>,
    pub themes: Vec<ConversationTheme>,
    pub start_time: DateTime<Utc>,
    pub message_count: u64,
}

// ============================================================================
// Immediate Layer
// ============================================================================

/// Phase of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    #[default]
    Greeting,
    Exploration,
    DeepDive,
    ProblemSolving,
    Closing,
}

impl ConversationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationPhase::Greeting => "greeting",
            ConversationPhase::Exploration => "exploration",
            ConversationPhase::DeepDive => "deep_dive",
            ConversationPhase::ProblemSolving => "problem_solving",
            ConversationPhase::Closing => "closing",
        }
    }
}

/// Conversation flow state with four 0-1 metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationFlow {
    pub phase: ConversationPhase,
    pub momentum: f64,
    pub depth: f64,
    pub engagement: f64,
    pub clarity: f64,
    pub transition_triggers: Vec<String>,
}

impl Default for ConversationFlow {
    fn default() -> Self {
        Self {
            phase: ConversationPhase::Greeting,
            momentum: 0.0,
            depth: 0.0,
            engagement: 0.5,
            clarity: 1.0,
            transition_triggers: Vec::new(),
        }
    }
}

/// Coarse time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    #[default]
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Environment metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnvironmentInfo {
    pub time_of_day: TimeOfDay,
    pub timezone: String,
    pub session_duration_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// The per-turn layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmediateContext {
    pub recent_messages: Vec<ChatMessage>,
    pub current_emotion: Emotion,
    pub flow: ConversationFlow,
    pub active_topics: Vec<String>,
    pub environment: EnvironmentInfo,
}

// ============================================================================
// Context
// ============================================================================

/// Layered snapshot of conversational state for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub system: SystemContext,
    pub session: SessionContext,
    pub immediate: ImmediateContext,
}

impl Context {
    /// Serialized byte length of the three layers.
    pub fn layer_size(&self) -> usize {
        layer_size(&self.system, &self.session, &self.immediate)
    }
}

/// Serialized byte length of the three context layers.
pub fn layer_size(
    system: &SystemContext,
    session: &SessionContext,
    immediate: &ImmediateContext,
) -> usize {
    [
        serde_json::to_vec(system).map(|v| v.len()),
        serde_json::to_vec(session).map(|v| v.len()),
        serde_json::to_vec(immediate).map(|v| v.len()),
    ]
    .into_iter()
    .map(|r| r.unwrap_or(0))
    .sum()
}

// ============================================================================
// Events
// ============================================================================

/// Events emitted by the context manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextEventType {
    ContextCreated,
    ContextUpdated,
    ContextCached,
    ContextRetrieved,
    ContextExpired,
    MemoryUpdated,
    PersonalityAdjusted,
    ErrorOccurred,
}

impl ContextEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextEventType::ContextCreated => "context_created",
            ContextEventType::ContextUpdated => "context_updated",
            ContextEventType::ContextCached => "context_cached",
            ContextEventType::ContextRetrieved => "context_retrieved",
            ContextEventType::ContextExpired => "context_expired",
            ContextEventType::MemoryUpdated => "memory_updated",
            ContextEventType::PersonalityAdjusted => "personality_adjusted",
            ContextEventType::ErrorOccurred => "error_occurred",
        }
    }
}

/// Event payload delivered to listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEvent {
    pub event_type: ContextEventType,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl ContextEvent {
    pub fn new(event_type: ContextEventType, session_id: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            session_id: session_id.into(),
            context_id: None,
            data: HashMap::new(),
        }
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}
