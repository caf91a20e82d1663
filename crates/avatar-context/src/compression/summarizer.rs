//! Conversation summarization.
//!
//! Builds short natural-language summaries of a context or a message list,
//! an emotional arc over the user's messages, and action items pulled from
//! commitment language ("need to", "should", "will").

use crate::emotion::EmotionScorer;
use crate::text::{contains_phrase, sentences, truncate};
use crate::topics;
use crate::types::{clamp_unit, ChatMessage, CommunicationStyle, Context, ResponseLength};

use super::types::{ArcTrend, ConversationSummary, EmotionalArc, EmotionalPeak};

/// Intensity at which a message counts as an emotional peak
pub const PEAK_INTENSITY: f64 = 0.6;

/// Maximum key points per compression
pub const MAX_KEY_POINTS: usize = 5;

/// Maximum action items per summary
const MAX_ACTION_ITEMS: usize = 10;

/// Messages quoted in a context summary
const QUOTED_MESSAGES: usize = 3;

/// Characters kept per quoted message or action item
const QUOTE_CHARS: usize = 60;
const ACTION_CHARS: usize = 100;

/// Phrases that mark a commitment or a task
const ACTION_CUES: &[&str] = &[
    "need to",
    "needs to",
    "should",
    "will",
    "have to",
    "must",
    "going to",
    "remember to",
];

/// One-paragraph summary of the context's immediate state.
pub fn summarize_context(context: &Context) -> String {
    let messages = &context.immediate.recent_messages;
    let mut parts = vec![format!(
        "Conversation of {} recent messages (session total {})",
        messages.len(),
        context.session.message_count
    )];

    if !context.immediate.active_topics.is_empty() {
        parts.push(format!(
            "about {}",
            context.immediate.active_topics.join(", ")
        ));
    }
    parts.push(format!(
        "user currently feels {}",
        context.immediate.current_emotion
    ));

    let quoted: Vec<String> = messages
        .iter()
        .rev()
        .filter(|m| m.is_user())
        .take(QUOTED_MESSAGES)
        .map(|m| format!("\"{}\"", truncate(m.content.trim(), QUOTE_CHARS)))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if !quoted.is_empty() {
        parts.push(format!("recently said {}", quoted.join(", ")));
    }

    format!("{}.", parts.join("; "))
}

/// Up to five key points from topics, themes and non-default preferences.
pub fn extract_key_points(context: &Context) -> Vec<String> {
    let mut points: Vec<String> = Vec::new();

    let mut themes = context.session.themes.clone();
    themes.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    for theme in &themes {
        points.push(format!(
            "Recurring theme: {} ({} mentions)",
            theme.topic, theme.frequency
        ));
    }

    for topic in &context.immediate.active_topics {
        if !themes.iter().any(|t| &t.topic == topic) {
            points.push(format!("Active topic: {}", topic));
        }
    }

    let profile = &context.session.user_profile;
    match profile.preferences.response_length {
        ResponseLength::Brief => points.push("Prefers brief responses".to_string()),
        ResponseLength::Detailed => points.push("Prefers detailed responses".to_string()),
        ResponseLength::Moderate => {}
    }
    if profile.communication_style != CommunicationStyle::default() {
        let style = format!("{:?}", profile.communication_style).to_lowercase();
        points.push(format!("Prefers a {} communication style", style));
    }
    if let Some(language) = &profile.preferences.language {
        points.push(format!("Preferred language: {}", language));
    }

    points.truncate(MAX_KEY_POINTS);
    points
}

/// Summarize a message list; empty input yields a zero-valued summary.
pub fn summarize_conversation(
    messages: &[ChatMessage],
    scorer: &dyn EmotionScorer,
) -> ConversationSummary {
    if messages.is_empty() {
        return ConversationSummary {
            summary: "No messages to summarize.".to_string(),
            ..Default::default()
        };
    }

    let user_messages: Vec<&ChatMessage> = messages.iter().filter(|m| m.is_user()).collect();
    let all_text = messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let topics = topics::extract_topics(&all_text);
    let emotional_arc = emotional_arc(messages, scorer);
    let action_items = extract_action_items(messages);

    let mut summary = format!(
        "{} messages ({} from the user)",
        messages.len(),
        user_messages.len()
    );
    if !topics.is_empty() {
        summary.push_str(&format!(" covering {}", topics.join(", ")));
    }
    summary.push_str(&format!(
        "; mood went from {} to {}",
        emotional_arc.start_emotion, emotional_arc.end_emotion
    ));
    if !action_items.is_empty() {
        summary.push_str(&format!("; {} action item(s)", action_items.len()));
    }
    summary.push('.');

    ConversationSummary {
        message_count: messages.len(),
        user_message_count: user_messages.len(),
        summary,
        topics,
        emotional_arc,
        action_items,
        start_time: messages.iter().map(|m| m.timestamp).min(),
        end_time: messages.iter().map(|m| m.timestamp).max(),
    }
}

/// Emotional arc over the user's messages (all messages if none are from
/// the user).
///
/// The trend compares positive and negative peaks: mixed when both occur and
/// neither side has at least twice the other's count.
pub fn emotional_arc(messages: &[ChatMessage], scorer: &dyn EmotionScorer) -> EmotionalArc {
    let mut tracked: Vec<(usize, &ChatMessage)> =
        messages.iter().enumerate().filter(|(_, m)| m.is_user()).collect();
    if tracked.is_empty() {
        tracked = messages.iter().enumerate().collect();
    }
    if tracked.is_empty() {
        return EmotionalArc::default();
    }

    let mut arc = EmotionalArc::default();
    let last = tracked.len() - 1;
    for (i, (position, message)) in tracked.into_iter().enumerate() {
        let signal = scorer.score_text(&message.content);
        if i == 0 {
            arc.start_emotion = signal.emotion;
        }
        if i == last {
            arc.end_emotion = signal.emotion;
        }

        let intensity =
            clamp_unit(signal.confidence + scorer.intensity_modifier(&message.content));
        let polar = signal.emotion.is_positive() || signal.emotion.is_negative();
        if polar && intensity >= PEAK_INTENSITY {
            arc.peaks.push(EmotionalPeak {
                message_id: message.id.clone(),
                position,
                emotion: signal.emotion,
                intensity,
            });
        }
    }

    let positive = arc.peaks.iter().filter(|p| p.emotion.is_positive()).count();
    let negative = arc.peaks.iter().filter(|p| p.emotion.is_negative()).count();
    arc.trend = match (positive, negative) {
        (0, 0) => ArcTrend::Neutral,
        (_, 0) => ArcTrend::Positive,
        (0, _) => ArcTrend::Negative,
        (p, n) if p >= 2 * n => ArcTrend::Positive,
        (p, n) if n >= 2 * p => ArcTrend::Negative,
        _ => ArcTrend::Mixed,
    };
    arc
}

/// Sentences containing commitment language, deduplicated, in order.
pub fn extract_action_items(messages: &[ChatMessage]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for message in messages {
        for sentence in sentences(&message.content) {
            let lower = sentence.to_lowercase();
            if !ACTION_CUES.iter().any(|cue| contains_phrase(&lower, cue)) {
                continue;
            }
            let item = truncate(&sentence, ACTION_CHARS);
            if !items.contains(&item) {
                items.push(item);
            }
            if items.len() >= MAX_ACTION_ITEMS {
                return items;
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::context_cache::tests::sample_context;
    use crate::emotion::KeywordEmotionScorer;
    use crate::types::{ConversationTheme, Emotion};
    use chrono::Utc;

    #[test]
    fn test_empty_conversation_is_zero_valued() {
        let summary = summarize_conversation(&[], &KeywordEmotionScorer::default());
        assert_eq!(summary.message_count, 0);
        assert!(summary.topics.is_empty());
        assert!(summary.action_items.is_empty());
        assert_eq!(summary.emotional_arc.trend, ArcTrend::Neutral);
        assert!(summary.start_time.is_none());
    }

    #[test]
    fn test_action_items_from_cues() {
        let messages = vec![
            ChatMessage::user("I need to call my mom tomorrow. The sky is blue."),
            ChatMessage::assistant("You should write that down! I will remind you."),
            ChatMessage::user("I need to call my mom tomorrow."),
        ];
        let items = extract_action_items(&messages);
        assert_eq!(
            items,
            vec![
                "I need to call my mom tomorrow",
                "You should write that down",
                "I will remind you",
            ]
        );
    }

    #[test]
    fn test_emotional_arc_trends() {
        let scorer = KeywordEmotionScorer::default();
        let positive = vec![
            ChatMessage::user("I'm so happy today!"),
            ChatMessage::user("This is absolutely amazing!"),
        ];
        let arc = emotional_arc(&positive, &scorer);
        assert_eq!(arc.trend, ArcTrend::Positive);
        assert_eq!(arc.start_emotion, Emotion::Happy);
        assert_eq!(arc.end_emotion, Emotion::Excited);

        let mixed = vec![
            ChatMessage::user("I'm so happy today!"),
            ChatMessage::user("Now I'm really sad and upset!"),
        ];
        assert_eq!(emotional_arc(&mixed, &scorer).trend, ArcTrend::Mixed);

        let flat = vec![ChatMessage::user("The table is brown.")];
        assert_eq!(emotional_arc(&flat, &scorer).trend, ArcTrend::Neutral);
    }

    #[test]
    fn test_summarize_conversation_counts_and_topics() {
        let messages = vec![
            ChatMessage::user("Let's talk about music and my new guitar"),
            ChatMessage::assistant("Sure, what kind of songs do you play?"),
        ];
        let summary = summarize_conversation(&messages, &KeywordEmotionScorer::default());
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.user_message_count, 1);
        assert_eq!(summary.topics, vec!["music"]);
        assert!(summary.summary.contains("music"));
    }

    #[test]
    fn test_key_points_capped_and_ordered() {
        let mut context = sample_context("ctx");
        let now = Utc::now();
        for (topic, frequency) in [("music", 2), ("travel", 5)] {
            context.session.themes.push(ConversationTheme {
                topic: topic.to_string(),
                confidence: 0.7,
                frequency,
                first_seen: now,
                last_seen: now,
            });
        }
        context.immediate.active_topics =
            vec!["music".to_string(), "food".to_string(), "sports".to_string()];
        context.session.user_profile.preferences.response_length = ResponseLength::Brief;
        context.session.user_profile.communication_style = CommunicationStyle::Formal;

        let points = extract_key_points(&context);
        assert_eq!(points.len(), MAX_KEY_POINTS);
        assert_eq!(points[0], "Recurring theme: travel (5 mentions)");
        assert!(points.contains(&"Active topic: food".to_string()));
        assert!(!points.contains(&"Active topic: music".to_string()));
    }

    #[test]
    fn test_summarize_context_mentions_emotion() {
        let mut context = sample_context("ctx");
        context.immediate.current_emotion = Emotion::Curious;
        context.immediate.recent_messages = vec![ChatMessage::user("How do volcanoes work?")];
        let summary = summarize_context(&context);
        assert!(summary.contains("curious"));
        assert!(summary.contains("volcanoes"));
    }
}
