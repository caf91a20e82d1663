//! Context Manager Module
//!
//! Orchestrates the context pipeline for one conversation:
//!
//! - Memory: every message lands in the memory tiers first
//! - Emotion: user messages are analyzed against the previous context
//! - Build: the three context layers are assembled
//! - Compress: oversized contexts are pruned before they are stored
//! - Cache: the result is cached under the session fingerprint
//! - Events: listeners hear `context_created`, `context_cached`,
//!   `memory_updated` and finally `context_updated` for each message
//!
//! The public pipeline methods never fail. Operational errors are logged,
//! reported as `error_occurred` events and replaced by a degraded context
//! built from whatever memory holds.
//!
//! # Example
//!
//! ```rust,ignore
//! use avatar_context::{ChatMessage, ContextManager, ContextSystemConfig};
//!
//! let mut manager = ContextManager::new(ContextSystemConfig::default());
//! let context = manager.process_message(ChatMessage::user("Hello!")).await;
//! let analysis = manager.analyze_context(&context);
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheLookup, CacheStats, ContextCache};
use crate::compression::{CompressionMetadata, ContextCompressor, ConversationSummary};
use crate::config::ContextSystemConfig;
use crate::emotion::{EmotionScorer, EmotionalAnalyzer, EmotionalTrend, KeywordEmotionScorer};
use crate::feedback::{
    apply_adjustments, FeedbackAggregate, FeedbackCategory, FeedbackStore, PersonalityAdjustment,
};
use crate::memory::{MemoryStats, MemoryStore, RelevantMemories};
use crate::types::{
    ChatMessage, Context, ContextError, ContextEvent, ContextEventType, ContextResult, Emotion,
    PersonalityTraits, ProfileUpdate, SessionContext,
};
use crate::validation::{ContextValidator, HealthReport, ValidationResult, ValidationRule};

use super::analysis::{self, ContextAnalysis};
use super::builder::{next_flow, update_themes, ContextBuilder};
use super::events::{EventEmitter, ListenerId};
use super::session::{EnvironmentOverrides, SessionState, SessionStats};

/// Topics added to a rebuilt context from the response query
const MAX_QUERY_TOPICS: usize = 5;

/// Snapshot returned by [`ContextManager::get_context_stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextStats {
    pub session: SessionStats,
    pub memory: MemoryStats,
    pub cache: CacheStats,
    /// Mean of recent validation scores
    pub validation_score: f64,
    pub feedback: Vec<FeedbackAggregate>,
    pub last_compression: Option<CompressionMetadata>,
    pub listeners: usize,
}

// ============================================================================
// ContextManager
// ============================================================================

/// Single-owner orchestrator for one conversation.
///
/// All state lives behind `&mut self`; the async methods only yield once at
/// entry, so nothing runs concurrently against the same state.
pub struct ContextManager {
    config: ContextSystemConfig,
    cache: ContextCache,
    memory: MemoryStore,
    analyzer: EmotionalAnalyzer,
    compressor: ContextCompressor,
    validator: ContextValidator,
    feedback: FeedbackStore,
    events: EventEmitter,
    builder: ContextBuilder,
    session: SessionState,
    last_compression: Option<CompressionMetadata>,
    destroyed: bool,
}

impl ContextManager {
    /// Create a manager with the keyword emotion scorer.
    pub fn new(config: ContextSystemConfig) -> Self {
        let scorer = Arc::new(KeywordEmotionScorer::with_weights(config.scoring.clone()));
        Self::with_scorer(config, scorer)
    }

    /// Create a manager with a custom emotion scoring backend.
    pub fn with_scorer(config: ContextSystemConfig, scorer: Arc<dyn EmotionScorer>) -> Self {
        let session = SessionState::new();
        info!(
            "Starting context session {} with {} scorer",
            session.session_id,
            scorer.name()
        );
        Self {
            cache: ContextCache::new(&config.cache),
            memory: MemoryStore::new(config.memory.clone(), scorer.clone()),
            analyzer: EmotionalAnalyzer::new(scorer.clone(), config.scoring.clone()),
            compressor: ContextCompressor::new(config.compression.clone(), scorer),
            validator: ContextValidator::new(config.validator.clone()),
            feedback: FeedbackStore::new(),
            events: EventEmitter::new(),
            builder: ContextBuilder::new(&config),
            session,
            last_compression: None,
            destroyed: false,
            config,
        }
    }

    pub fn config(&self) -> &ContextSystemConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    /// Process an inbound message and return the context for this turn.
    ///
    /// Never fails: on any internal error a degraded context is returned and
    /// an `error_occurred` event is emitted.
    pub async fn process_message(&mut self, message: ChatMessage) -> Context {
        tokio::task::yield_now().await;
        let started = Instant::now();

        let context = match self.try_process_message(&message) {
            Ok(context) => context,
            Err(err) => {
                self.report_error("process_message", &err);
                self.degraded_context()
            }
        };

        let elapsed = started.elapsed().as_millis();
        if elapsed > u128::from(self.config.processing_timeout_ms) {
            warn!(
                "Processing message {} took {}ms, over the advisory {}ms",
                message.id, elapsed, self.config.processing_timeout_ms
            );
        }
        context
    }

    fn try_process_message(&mut self, message: &ChatMessage) -> ContextResult<Context> {
        self.ensure_alive()?;
        if message.id.trim().is_empty() || message.content.trim().is_empty() {
            return Err(ContextError::MalformedMessage(format!(
                "message '{}' has no id or content",
                message.id
            )));
        }

        let previous = self.memory.current_context().cloned();
        let user_id = self.memory.profile().user_id.clone();
        let analysis = message.is_user().then(|| {
            self.analyzer
                .analyze_message(&user_id, message, previous.as_ref())
        });

        let update = self
            .memory
            .process_message(message, None, analysis.as_ref())?;

        self.session.observe(message.timestamp);
        if message.is_user() {
            update_themes(&mut self.session.themes, &message.content, message.timestamp);
        }

        let recent = self.memory.recent_messages(self.builder.context_window());
        self.session.flow = next_flow(
            &self.session.flow,
            &recent,
            analysis.as_ref(),
            &self.session.themes,
        );

        let emotion = analysis
            .as_ref()
            .map(|a| a.detected_emotion)
            .or_else(|| previous.as_ref().map(|c| c.immediate.current_emotion))
            .unwrap_or(Emotion::Neutral);
        let context = self.builder.build(
            &self.session,
            self.memory.profile(),
            recent,
            emotion,
            message.timestamp,
        );
        let context = self.compress(context);

        let validation = self.validator.validate_context(&context);
        debug!(
            "Built context {} for message {} (validation score {:.2})",
            context.id, message.id, validation.score
        );

        self.memory.record_context(context.clone());
        self.emit(
            self.event(ContextEventType::ContextCreated)
                .with_context_id(&context.id)
                .with_data("message_id", message.id.clone())
                .with_data("emotion", emotion.as_str()),
        );
        self.cache_context(&context);
        self.emit(
            self.event(ContextEventType::MemoryUpdated)
                .with_context_id(&context.id)
                .with_data("significant", update.significant)
                .with_data("preferences_learned", update.preferences_learned)
                .with_data("short_term_evicted", update.short_term_evicted),
        );
        self.emit(
            self.event(ContextEventType::ContextUpdated)
                .with_context_id(&context.id)
                .with_data("message_id", message.id.clone())
                .with_data("emotion", emotion.as_str()),
        );

        Ok(context)
    }

    /// Context for generating a response: cached if available, otherwise
    /// rebuilt from memory with the query's topics folded in.
    ///
    /// Cache failures are treated as misses. Never fails.
    pub async fn get_context_for_response(&mut self, query: &str) -> Context {
        tokio::task::yield_now().await;
        if let Err(err) = self.ensure_alive() {
            self.report_error("get_context_for_response", &err);
            return self.degraded_context();
        }

        let key = self.cache_key();
        match self.cache.lookup(&key) {
            Ok(CacheLookup::Hit(context)) => {
                self.emit(
                    self.event(ContextEventType::ContextRetrieved)
                        .with_context_id(&context.id),
                );
                return *context;
            }
            Ok(CacheLookup::Expired) => {
                self.emit(self.event(ContextEventType::ContextExpired));
            }
            Ok(CacheLookup::Miss) => {}
            Err(err) => self.report_error("cache lookup", &ContextError::from(err)),
        }

        let context = self.rebuild_context(query);
        self.cache_context(&context);
        context
    }

    fn rebuild_context(&mut self, query: &str) -> Context {
        let mut context = self.degraded_context();
        for topic in crate::topics::extract_topics(query) {
            if context.immediate.active_topics.len() >= MAX_QUERY_TOPICS {
                break;
            }
            if !context.immediate.active_topics.contains(&topic) {
                context.immediate.active_topics.push(topic);
            }
        }
        let context = self.compress(context);
        self.memory.record_context(context.clone());

        debug!("Rebuilt context {} from memory", context.id);
        self.emit(
            self.event(ContextEventType::ContextCreated)
                .with_context_id(&context.id)
                .with_data("rebuilt", true),
        );
        context
    }

    /// Analyze a context and notify `context_updated` listeners.
    pub fn analyze_context(&self, context: &Context) -> ContextAnalysis {
        let query = context
            .immediate
            .recent_messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map_or("", |m| m.content.as_str());
        let memories = self.memory.get_relevant_memories(query);

        let user_id = &context.session.user_profile.user_id;
        let trend = self.analyzer.emotional_trend(user_id);
        let intensity = self
            .analyzer
            .user_history(user_id)
            .last()
            .map_or(0.0, |r| r.intensity);

        let analysis = analysis::analyze_context(context, &memories, trend, intensity);
        self.emit(
            self.event(ContextEventType::ContextUpdated)
                .with_context_id(&context.id)
                .with_data("relevance_score", analysis.relevance_score)
                .with_data("intent", json!(analysis.user_intent.intent)),
        );
        analysis
    }

    // ------------------------------------------------------------------------
    // Profile and session
    // ------------------------------------------------------------------------

    pub fn update_user_profile(&mut self, update: ProfileUpdate) {
        let stale_key = self.cache_key();
        self.memory.update_profile(update);
        self.cache.delete(&stale_key);
        info!("Updated user profile for {}", self.memory.profile().user_id);
        self.emit(
            self.event(ContextEventType::MemoryUpdated)
                .with_data("profile_updated", true),
        );
    }

    /// Start a fresh session.
    ///
    /// Short-term and working memory and the cache are always cleared. The
    /// user profile, learned preferences, emotional history and feedback
    /// survive when `preserve_profile` is set.
    pub fn clear_session(&mut self, preserve_profile: bool) {
        self.memory.clear_memories(preserve_profile);
        self.cache.clear();
        if !preserve_profile {
            self.analyzer.clear_all_history();
            self.feedback.clear();
        }
        self.last_compression = None;

        let environment = std::mem::take(&mut self.session.environment);
        let previous = std::mem::replace(&mut self.session, SessionState::new());
        self.session.environment = environment;

        info!(
            "Cleared session {} (preserve_profile: {}), new session {}",
            previous.session_id, preserve_profile, self.session.session_id
        );
        self.emit(
            self.event(ContextEventType::MemoryUpdated)
                .with_data("cleared", true)
                .with_data("preserve_profile", preserve_profile),
        );
    }

    /// The session layer as it stands now.
    pub fn get_current_session_context(&self) -> SessionContext {
        self.session.session_context(self.memory.profile())
    }

    /// The context built for the latest message, if any.
    pub fn current_context(&self) -> Option<&Context> {
        self.memory.current_context()
    }

    pub fn get_context_stats(&self) -> ContextStats {
        ContextStats {
            session: SessionStats::from_state(&self.session),
            memory: self.memory.get_memory_stats(),
            cache: self.cache.stats(),
            validation_score: self.validator.average_score(),
            feedback: self.feedback.aggregates(),
            last_compression: self.last_compression.clone(),
            listeners: self.events.total_listeners(),
        }
    }

    /// Device and network labels reported in environment metadata.
    pub fn set_environment(&mut self, device: Option<String>, network: Option<String>) {
        self.session.environment = EnvironmentOverrides { device, network };
    }

    pub fn set_objectives(&mut self, objectives: Vec<String>) {
        self.session.objectives = objectives;
    }

    // ------------------------------------------------------------------------
    // Memory, emotion and summaries
    // ------------------------------------------------------------------------

    pub fn get_relevant_memories(&self, query: &str) -> RelevantMemories {
        self.memory.get_relevant_memories(query)
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn emotional_trend(&self) -> EmotionalTrend {
        self.analyzer
            .emotional_trend(&self.memory.profile().user_id)
    }

    /// Summary of everything in short-term memory.
    pub fn summarize_conversation(&self) -> ConversationSummary {
        let messages = self.memory.recent_messages(self.config.memory.short_term);
        self.compressor.summarize_conversation(&messages)
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    pub fn add_validation_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.validator.add_rule(rule);
    }

    pub fn validate_context(&mut self, context: &Context) -> ValidationResult {
        self.validator.validate_context(context)
    }

    pub fn perform_health_check(&mut self, context: &Context) -> HealthReport {
        HealthReport::from_validation(&self.validator.validate_context(context))
    }

    // ------------------------------------------------------------------------
    // Feedback
    // ------------------------------------------------------------------------

    /// Record a rating for the response built from `context_id`.
    ///
    /// When the category has been rated poorly, the suggested personality
    /// adjustments are applied to future contexts and returned.
    pub fn record_feedback(
        &mut self,
        context_id: &str,
        category: FeedbackCategory,
        rating: f64,
        comment: Option<String>,
    ) -> ContextResult<Vec<PersonalityAdjustment>> {
        self.ensure_alive()?;
        self.feedback.record(context_id, category, rating, comment)?;

        let adjustments = self.feedback.suggest_adjustments(category);
        if !adjustments.is_empty() {
            let mut personality = self.builder.personality().clone();
            apply_adjustments(&mut personality, &adjustments);
            self.apply_personality(personality);
            info!(
                "Adjusted personality after {:?} feedback ({} changes)",
                category,
                adjustments.len()
            );
            self.emit(
                self.event(ContextEventType::PersonalityAdjusted)
                    .with_data("category", json!(category))
                    .with_data("adjustments", json!(adjustments)),
            );
        }
        Ok(adjustments)
    }

    pub fn personality(&self) -> &PersonalityTraits {
        self.builder.personality()
    }

    fn apply_personality(&mut self, personality: PersonalityTraits) {
        self.config.personality = personality.clone();
        self.builder.set_personality(personality);
        // Cached contexts carry the old system layer
        let key = self.cache_key();
        self.cache.delete(&key);
    }

    // ------------------------------------------------------------------------
    // Events and lifecycle
    // ------------------------------------------------------------------------

    pub fn on<F>(&mut self, event_type: ContextEventType, listener: F) -> ListenerId
    where
        F: Fn(&ContextEvent) + Send + Sync + 'static,
    {
        self.events.on(event_type, listener)
    }

    pub fn off(&mut self, event_type: ContextEventType, id: ListenerId) -> bool {
        self.events.off(event_type, id)
    }

    /// Release cache and memory and drop all listeners. Later pipeline calls
    /// return degraded contexts.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.cache.clear();
        self.cache.disable();
        self.memory.clear_memories(false);
        self.analyzer.clear_all_history();
        self.feedback.clear();
        self.events.clear();
        self.last_compression = None;
        self.destroyed = true;
        info!("Destroyed context manager for session {}", self.session.session_id);
    }

    /// Cache of built contexts.
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Mutable cache access, e.g. to disable the backing store.
    pub fn cache_mut(&mut self) -> &mut ContextCache {
        &mut self.cache
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_alive(&self) -> ContextResult<()> {
        if self.destroyed {
            Err(ContextError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn cache_key(&self) -> String {
        CacheKey::current(&self.session.session_id, &self.memory.profile().user_id)
    }

    fn compress(&mut self, context: Context) -> Context {
        if !self.compressor.should_compress(&context) {
            return context;
        }
        let result = self.compressor.compress_context(&context);
        let compacted = result.apply_to(&context);
        self.last_compression = Some(result.metadata);
        compacted
    }

    fn cache_context(&mut self, context: &Context) {
        let key = self.cache_key();
        match self.cache.set(key, context.clone()) {
            Ok(()) => self.emit(
                self.event(ContextEventType::ContextCached)
                    .with_context_id(&context.id),
            ),
            Err(err) => self.report_error("cache store", &ContextError::from(err)),
        }
    }

    /// Best-effort context from whatever memory holds.
    fn degraded_context(&self) -> Context {
        let recent = self.memory.recent_messages(self.builder.context_window());
        let emotion = self
            .memory
            .current_context()
            .map_or(Emotion::Neutral, |c| c.immediate.current_emotion);
        let at = recent.last().map_or_else(Utc::now, |m| m.timestamp);
        self.builder
            .build(&self.session, self.memory.profile(), recent, emotion, at)
    }

    fn report_error(&self, operation: &str, err: &ContextError) {
        warn!("Context {} failed: {}", operation, err);
        self.emit(
            self.event(ContextEventType::ErrorOccurred)
                .with_data("operation", operation)
                .with_data("error", err.to_string()),
        );
    }

    fn event(&self, event_type: ContextEventType) -> ContextEvent {
        ContextEvent::new(event_type, self.session.session_id.clone())
    }

    fn emit(&self, event: ContextEvent) {
        self.events.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::ANONYMOUS_USER;
    use std::sync::Mutex;

    fn manager() -> ContextManager {
        ContextManager::new(ContextSystemConfig::default())
    }

    fn record_events(manager: &mut ContextManager) -> Arc<Mutex<Vec<ContextEventType>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for event_type in [
            ContextEventType::ContextCreated,
            ContextEventType::ContextUpdated,
            ContextEventType::ContextCached,
            ContextEventType::ContextRetrieved,
            ContextEventType::ContextExpired,
            ContextEventType::MemoryUpdated,
            ContextEventType::ErrorOccurred,
        ] {
            let seen = seen.clone();
            manager.on(event_type, move |e| seen.lock().unwrap().push(e.event_type));
        }
        seen
    }

    #[tokio::test]
    async fn test_process_message_builds_and_caches() {
        let mut manager = manager();
        let seen = record_events(&mut manager);

        let context = manager
            .process_message(ChatMessage::user("I'm absolutely thrilled about this!"))
            .await;
        assert_eq!(context.immediate.current_emotion, Emotion::Excited);
        assert_eq!(context.immediate.recent_messages.len(), 1);
        assert_eq!(context.session.message_count, 1);
        assert_eq!(manager.current_context().map(|c| &c.id), Some(&context.id));
        assert_eq!(manager.cache().len(), 1);

        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ContextEventType::ContextCreated,
                ContextEventType::ContextCached,
                ContextEventType::MemoryUpdated,
                ContextEventType::ContextUpdated,
            ]
        );
    }

    #[tokio::test]
    async fn test_emotion_history_follows_profile_user() {
        let mut manager = manager();
        manager.update_user_profile(ProfileUpdate {
            user_id: Some("u1".to_string()),
            ..Default::default()
        });

        manager.process_message(ChatMessage::user("I'm so sad")).await;
        manager.process_message(ChatMessage::user("I'm sad and upset")).await;
        assert_eq!(manager.analyzer.user_history("u1").len(), 2);
        assert!(manager.analyzer.user_history(ANONYMOUS_USER).is_empty());
        assert_eq!(manager.emotional_trend(), EmotionalTrend::Declining);

        manager.clear_session(true);
        manager.process_message(ChatMessage::user("still sad")).await;
        assert_eq!(manager.analyzer.user_history("u1").len(), 3);
        assert!(manager.analyzer.user_history(ANONYMOUS_USER).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_message_degrades() {
        let mut manager = manager();
        let seen = record_events(&mut manager);

        let context = manager.process_message(ChatMessage::user("   ")).await;
        assert!(context.immediate.recent_messages.is_empty());
        assert_eq!(context.session.message_count, 0);
        assert!(seen
            .lock()
            .unwrap()
            .contains(&ContextEventType::ErrorOccurred));
    }

    #[tokio::test]
    async fn test_response_context_hit_and_miss() {
        let mut manager = manager();
        let seen = record_events(&mut manager);

        let built = manager.process_message(ChatMessage::user("hello")).await;
        let cached = manager.get_context_for_response("hello").await;
        assert_eq!(cached.id, built.id);
        assert!(seen
            .lock()
            .unwrap()
            .contains(&ContextEventType::ContextRetrieved));

        manager.cache_mut().clear();
        let rebuilt = manager
            .get_context_for_response("tell me about your favourite music")
            .await;
        assert_ne!(rebuilt.id, built.id);
        assert!(rebuilt.immediate.active_topics.contains(&"music".to_string()));
        assert_eq!(rebuilt.immediate.recent_messages.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_failure_is_treated_as_miss() {
        let mut manager = manager();
        manager.process_message(ChatMessage::user("hello")).await;
        manager.cache_mut().disable();
        let seen = record_events(&mut manager);

        let context = manager.process_message(ChatMessage::user("still here?")).await;
        assert_eq!(context.immediate.recent_messages.len(), 2);

        let response = manager.get_context_for_response("anything").await;
        assert_eq!(response.immediate.recent_messages.len(), 2);

        let events = seen.lock().unwrap().clone();
        assert!(events.contains(&ContextEventType::ErrorOccurred));
        assert!(!events.contains(&ContextEventType::ContextCached));
    }

    #[tokio::test]
    async fn test_clear_session_is_idempotent() {
        let mut manager = manager();
        manager.update_user_profile(ProfileUpdate {
            name: Some("Sam".to_string()),
            ..Default::default()
        });
        manager.process_message(ChatMessage::user("I love hiking")).await;
        let profile = manager.memory().profile().clone();
        let first_session = manager.session_id().to_string();

        manager.clear_session(true);
        assert_eq!(manager.memory().profile(), &profile);
        manager.clear_session(true);
        assert_eq!(manager.memory().profile(), &profile);
        assert_ne!(manager.session_id(), first_session);
        assert!(manager.current_context().is_none());
        assert_eq!(manager.get_current_session_context().message_count, 0);

        manager.clear_session(false);
        assert_eq!(manager.memory().profile().name, None);
        manager.clear_session(false);
        assert_eq!(manager.memory().profile().name, None);
    }

    #[tokio::test]
    async fn test_destroy_releases_resources() {
        let mut manager = manager();
        manager.process_message(ChatMessage::user("hello")).await;
        manager.destroy();
        assert!(manager.is_destroyed());
        assert!(manager.cache().is_empty());

        let context = manager.process_message(ChatMessage::user("again")).await;
        assert!(context.immediate.recent_messages.is_empty());
        assert!(manager
            .record_feedback("ctx", FeedbackCategory::Tone, 0.5, None)
            .is_err());
    }

    #[test]
    fn test_feedback_adjusts_personality() {
        let mut manager = manager();
        let adjusted = Arc::new(Mutex::new(0));
        let counter = adjusted.clone();
        manager.on(ContextEventType::PersonalityAdjusted, move |_| {
            *counter.lock().unwrap() += 1;
        });

        let warmth = manager.personality().warmth;
        for _ in 0..3 {
            manager
                .record_feedback("ctx", FeedbackCategory::Tone, 0.1, None)
                .unwrap();
        }
        assert!(manager.personality().warmth > warmth);
        assert_eq!(*adjusted.lock().unwrap(), 1);
        assert!(manager
            .record_feedback("ctx", FeedbackCategory::Tone, 2.0, None)
            .is_err());
    }

    #[tokio::test]
    async fn test_stats_cover_all_parts() {
        let mut manager = manager();
        manager.process_message(ChatMessage::user("hello")).await;
        manager.process_message(ChatMessage::assistant("Hi there!")).await;

        let stats = manager.get_context_stats();
        assert_eq!(stats.session.message_count, 2);
        assert_eq!(stats.memory.short_term.count, 2);
        assert_eq!(stats.cache.size, 1);
        assert!(stats.validation_score > 0.7);
        assert_eq!(stats.feedback.len(), 5);
    }
}
