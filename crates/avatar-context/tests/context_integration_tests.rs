//! Integration tests for the avatar context pipeline
//!
//! These tests drive a [`ContextManager`] end to end through its public API.
//!
//! # Test Coverage
//!
//! - Message processing, caching and retrieval
//! - Emotion detection flowing into the immediate layer
//! - Compression of long conversations
//! - Validation of untyped contexts
//! - Session lifecycle, feedback and events
//! - Configuration files and environment overrides

use std::sync::{Arc, Mutex};

use avatar_context::compression::ContextCompressor;
use avatar_context::config::CompressionConfig;
use avatar_context::manager::IntentKind;
use avatar_context::types::ConversationPhase;
use avatar_context::validation::{HealthStatus, Severity};
use avatar_context::{
    ChatMessage, ContextEventType, ContextManager, ContextSystemConfig, ContextValidator,
    Emotion, FeedbackCategory, KeywordEmotionScorer, ProfileUpdate,
};
use chrono::{Duration, Utc};
use serial_test::serial;
use tempfile::TempDir;

fn manager() -> ContextManager {
    ContextManager::new(ContextSystemConfig::default())
}

// ============================================================================
// Integration Test: Full Conversation Workflow
// ============================================================================

/// Process a short conversation and check that every layer reflects it.
#[tokio::test]
async fn test_full_conversation_workflow() {
    let mut manager = manager();
    manager.update_user_profile(ProfileUpdate {
        user_id: Some("user-42".to_string()),
        name: Some("Robin".to_string()),
        ..Default::default()
    });
    manager.set_environment(Some("desktop".to_string()), Some("wifi".to_string()));

    let start = Utc::now() - Duration::minutes(10);
    let script = [
        ChatMessage::user("Hello!").with_timestamp(start),
        ChatMessage::assistant("Hi Robin! How are you today?")
            .with_timestamp(start + Duration::seconds(5)),
        ChatMessage::user("I love jazz music and I just bought a new guitar")
            .with_timestamp(start + Duration::seconds(20)),
        ChatMessage::assistant("That's wonderful! What songs are you learning?")
            .with_timestamp(start + Duration::seconds(30)),
        ChatMessage::user("Mostly old jazz songs. Can you recommend a good album?")
            .with_timestamp(start + Duration::seconds(50)),
    ];

    let mut last = None;
    for message in script {
        last = Some(manager.process_message(message).await);
    }
    let context = last.unwrap();

    assert_eq!(context.session.message_count, 5);
    assert_eq!(context.session.user_profile.user_id, "user-42");
    assert_eq!(context.immediate.recent_messages.len(), 5);
    assert!(context.immediate.active_topics.contains(&"music".to_string()));
    assert!(context.session.themes.iter().any(|t| t.topic == "music"));
    assert_eq!(context.immediate.environment.device.as_deref(), Some("desktop"));
    assert!(context.timestamp >= context.session.start_time);
    assert_ne!(context.immediate.flow.phase, ConversationPhase::Closing);

    let memories = manager.get_relevant_memories("jazz");
    assert!(!memories.learned_preferences.is_empty());
    assert!(memories.relevance_score > 0.0);

    let analysis = manager.analyze_context(&context);
    assert_eq!(analysis.user_intent.intent, IntentKind::Request);
    assert!((0.0..=1.0).contains(&analysis.relevance_score));
    assert!(!analysis.recommendations.is_empty());

    let mut validator = ContextValidator::new(Default::default());
    let result = validator.validate_context(&context);
    assert!(result.is_valid, "{:?}", result.errors);
    assert!(result.score >= 0.7);
}

#[tokio::test]
async fn test_thrilled_message_is_excited() {
    let mut manager = manager();
    let context = manager
        .process_message(ChatMessage::user("I'm absolutely thrilled about this!"))
        .await;
    assert_eq!(context.immediate.current_emotion, Emotion::Excited);
}

// ============================================================================
// Integration Test: Cache Behaviour
// ============================================================================

#[tokio::test]
async fn test_response_context_uses_cache_then_rebuilds() {
    let mut manager = manager();
    let built = manager.process_message(ChatMessage::user("hi there")).await;

    for _ in 0..3 {
        let context = manager.get_context_for_response("hi").await;
        assert_eq!(context.id, built.id);
    }
    let stats = manager.get_context_stats();
    assert_eq!(stats.cache.hits, 3);
    assert!(stats.cache.hit_rate > 0.0);

    manager.cache_mut().disable();
    let context = manager.get_context_for_response("hi").await;
    assert_ne!(context.id, built.id);
    assert_eq!(context.immediate.recent_messages.len(), 1);
}

#[tokio::test]
async fn test_expired_entry_emits_event() {
    let mut config = ContextSystemConfig::default();
    config.cache.ttl_secs = 1;
    let mut manager = ContextManager::new(config);
    let expired = Arc::new(Mutex::new(0));
    let counter = expired.clone();
    manager.on(ContextEventType::ContextExpired, move |_| {
        *counter.lock().unwrap() += 1;
    });

    manager.process_message(ChatMessage::user("hello")).await;
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    manager.get_context_for_response("hello").await;

    assert_eq!(*expired.lock().unwrap(), 1);
    assert_eq!(manager.get_context_stats().cache.expired_count, 1);
}

// ============================================================================
// Integration Test: Compression
// ============================================================================

#[tokio::test]
async fn test_long_conversation_is_compressed() {
    let mut config = ContextSystemConfig::default();
    config.compression.compression_threshold = 4_096;
    config.compression.retention_period = 5;
    let mut manager = ContextManager::new(config);

    let mut context = None;
    for i in 0..20 {
        let text = format!("Message number {} with plenty of padding text. ", i).repeat(8);
        context = Some(manager.process_message(ChatMessage::user(text)).await);
    }
    let context = context.unwrap();

    assert!(context.immediate.recent_messages.len() <= 5);
    let compression = manager.get_context_stats().last_compression.unwrap();
    assert!(compression.compressed);
    assert_eq!(compression.original_message_count, 20);
}

#[test]
fn test_longer_question_outranks_short_reply() {
    let compressor = ContextCompressor::new(
        CompressionConfig::default(),
        Arc::new(KeywordEmotionScorer::default()),
    );
    let short = ChatMessage::user("Yes.");
    let long = ChatMessage::user(format!("{}?", "tell me more about this ".repeat(7)));
    assert!(long.content.len() >= 150);
    assert!(
        compressor.score_message_importance(&long, 0, 2)
            > compressor.score_message_importance(&short, 0, 2)
    );
}

// ============================================================================
// Integration Test: Validation
// ============================================================================

#[tokio::test]
async fn test_context_missing_layers_is_invalid() {
    let mut manager = manager();
    let context = manager.process_message(ChatMessage::user("hello")).await;
    let mut validator = ContextValidator::new(Default::default());

    for layer in ["system", "session", "immediate"] {
        let mut value = serde_json::to_value(&context).unwrap();
        value.as_object_mut().unwrap().remove(layer);
        let result = validator.validate_value(&value);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.severity == Severity::Critical));
    }

    let report = manager.perform_health_check(&context);
    assert_eq!(report.status, HealthStatus::Healthy);
}

// ============================================================================
// Integration Test: Session Lifecycle
// ============================================================================

#[tokio::test]
async fn test_clear_session_twice() {
    let mut manager = manager();
    manager.update_user_profile(ProfileUpdate {
        name: Some("Kai".to_string()),
        ..Default::default()
    });
    manager.process_message(ChatMessage::user("I enjoy cooking pasta")).await;

    manager.clear_session(true);
    manager.clear_session(true);
    assert_eq!(manager.memory().profile().name.as_deref(), Some("Kai"));
    assert!(!manager.memory().learned_preferences().is_empty());

    manager.clear_session(false);
    manager.clear_session(false);
    assert_eq!(manager.memory().profile().name, None);
    assert!(manager.memory().learned_preferences().is_empty());
}

#[tokio::test]
async fn test_events_in_order_and_panics_contained() {
    let mut manager = manager();
    let log = Arc::new(Mutex::new(Vec::new()));

    manager.on(ContextEventType::ContextCreated, |_| panic!("bad listener"));
    for event_type in [
        ContextEventType::ContextCreated,
        ContextEventType::ContextCached,
        ContextEventType::MemoryUpdated,
    ] {
        let log = log.clone();
        manager.on(event_type, move |e| {
            log.lock().unwrap().push(e.event_type.as_str().to_string());
        });
    }
    let id = {
        let log = log.clone();
        manager.on(ContextEventType::ContextUpdated, move |e| {
            log.lock().unwrap().push(e.event_type.as_str().to_string());
        })
    };

    let context = manager.process_message(ChatMessage::user("hello")).await;
    manager.analyze_context(&context);
    assert!(manager.off(ContextEventType::ContextUpdated, id));
    manager.analyze_context(&context);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "context_created",
            "context_cached",
            "memory_updated",
            "context_updated",
            "context_updated"
        ]
    );
}

#[tokio::test]
async fn test_feedback_loop_adjusts_future_contexts() {
    let mut manager = manager();
    let context = manager.process_message(ChatMessage::user("hello")).await;
    let before = context.system.personality.empathy;

    for _ in 0..4 {
        manager
            .record_feedback(&context.id, FeedbackCategory::Empathy, 0.0, None)
            .unwrap();
    }
    let next = manager.process_message(ChatMessage::user("hello again")).await;
    assert!(next.system.personality.empathy > before);
    assert!(next.system.personality.empathy <= 1.0);
}

#[tokio::test]
async fn test_destroyed_manager_still_answers() {
    let mut manager = manager();
    manager.process_message(ChatMessage::user("hello")).await;
    manager.destroy();
    manager.destroy();

    let context = manager.get_context_for_response("anything").await;
    assert!(context.immediate.recent_messages.is_empty());
    assert_eq!(manager.get_context_stats().listeners, 0);
}

// ============================================================================
// Integration Test: Configuration
// ============================================================================

#[test]
fn test_config_file_drives_manager() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("context.yaml");
    std::fs::write(
        &path,
        "cache:\n  max_size: 3\ncontext_window: 4\ntimezone: Europe/Berlin\n",
    )
    .unwrap();

    let config = ContextSystemConfig::from_file(&path).unwrap();
    config.validate().unwrap();
    let manager = ContextManager::new(config);
    assert_eq!(manager.config().cache.max_size, 3);
    assert_eq!(manager.config().context_window, 4);
    assert_eq!(manager.get_context_stats().cache.max_size, 3);
}

#[test]
#[serial]
fn test_env_overrides_apply() {
    std::env::set_var("AVATAR_CONTEXT_STRICT_MODE", "true");
    let mut config = ContextSystemConfig::default();
    config.apply_env_overrides();
    std::env::remove_var("AVATAR_CONTEXT_STRICT_MODE");
    assert!(config.validator.strict_mode);
}
