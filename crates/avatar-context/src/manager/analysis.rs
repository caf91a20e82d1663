//! Context analysis for response generation.
//!
//! Turns a built context plus the relevant memories into a relevance score,
//! an emotional tone, topic classification, a user-intent guess and a list
//! of response recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionalTrend, ToneAdjustment};
use crate::memory::{PreferencePolarity, RelevantMemories};
use crate::text::{contains_phrase, tokenize};
use crate::topics::{self, TopicScore};
use crate::types::{clamp_unit, Context, Emotion, ResponseLength};

/// Relevance weights: memories, topic alignment, recency
const MEMORY_WEIGHT: f64 = 0.4;
const TOPIC_WEIGHT: f64 = 0.3;
const FRESHNESS_WEIGHT: f64 = 0.3;

/// Minutes after which the last message no longer counts as fresh
const FRESH_MINUTES: f64 = 5.0;
const STALE_MINUTES: f64 = 60.0;

const GREETING_CUES: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "howdy",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
];
const FAREWELL_CUES: &[&str] = &[
    "bye",
    "goodbye",
    "see you",
    "good night",
    "talk later",
    "gotta go",
    "farewell",
];
const FEEDBACK_CUES: &[&str] = &[
    "thanks",
    "thank you",
    "helpful",
    "great answer",
    "good answer",
    "that's wrong",
    "you're wrong",
    "not what i asked",
    "perfect",
];
const REQUEST_CUES: &[&str] = &[
    "please",
    "can you",
    "could you",
    "would you",
    "tell me",
    "show me",
    "help me",
    "i want",
    "i need",
    "let's",
];
const QUESTION_STARTERS: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "which", "is", "are", "do", "does", "can",
    "should",
];
const SHARING_CUES: &[&str] = &[
    "i feel",
    "i'm feeling",
    "i think",
    "today i",
    "i just",
    "guess what",
    "my",
    "i was",
];

/// What the user is trying to do with their message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Question,
    Request,
    Greeting,
    Farewell,
    Feedback,
    Sharing,
    Chitchat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIntent {
    pub intent: IntentKind,
    pub confidence: f64,
    /// Cues that triggered the classification
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalTone {
    pub emotion: Emotion,
    pub intensity: f64,
    pub trend: EmotionalTrend,
    pub tone: ToneAdjustment,
}

/// Output of `analyze_context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAnalysis {
    pub context_id: String,
    pub relevance_score: f64,
    pub emotional_tone: EmotionalTone,
    pub topics: Vec<TopicScore>,
    pub user_intent: UserIntent,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Classify the intent of a message.
///
/// The kind with the most cues wins; ties go to the earlier kind in
/// farewell, greeting, feedback, request, question, sharing order.
/// Greeting cues only count at the start of the message.
pub fn detect_intent(text: &str) -> UserIntent {
    let lower = text.to_lowercase();
    let tokens = tokenize(text);
    let opening = tokens.iter().take(2).cloned().collect::<Vec<_>>().join(" ");

    let cues = |list: &[&str], haystack: &str| -> Vec<String> {
        list.iter()
            .filter(|cue| contains_phrase(haystack, cue))
            .map(|cue| (*cue).to_string())
            .collect()
    };

    let mut question = Vec::new();
    if text.contains('?') {
        question.push("?".to_string());
    }
    if let Some(first) = tokens.first() {
        if QUESTION_STARTERS.contains(&first.as_str()) {
            question.push(first.clone());
        }
    }

    let candidates = [
        (IntentKind::Farewell, cues(FAREWELL_CUES, &lower)),
        (IntentKind::Greeting, cues(GREETING_CUES, &opening)),
        (IntentKind::Feedback, cues(FEEDBACK_CUES, &lower)),
        (IntentKind::Request, cues(REQUEST_CUES, &lower)),
        (IntentKind::Question, question),
        (IntentKind::Sharing, cues(SHARING_CUES, &lower)),
    ];

    let best = candidates
        .into_iter()
        .filter(|(_, indicators)| !indicators.is_empty())
        .fold(None::<(IntentKind, Vec<String>)>, |best, candidate| match best {
            Some(ref b) if b.1.len() >= candidate.1.len() => best,
            _ => Some(candidate),
        });

    match best {
        Some((intent, indicators)) => UserIntent {
            intent,
            confidence: (0.5 + 0.15 * (indicators.len() as f64 - 1.0)).min(0.95),
            indicators,
        },
        None => UserIntent {
            intent: IntentKind::Chitchat,
            confidence: 0.3,
            indicators: Vec::new(),
        },
    }
}

/// Analyze a context against the memories relevant to it.
///
/// `intensity` and `trend` come from the emotional analyzer's history for
/// the session's user.
pub fn analyze_context(
    context: &Context,
    memories: &RelevantMemories,
    trend: EmotionalTrend,
    intensity: f64,
) -> ContextAnalysis {
    let last_user = context
        .immediate
        .recent_messages
        .iter()
        .rev()
        .find(|m| m.is_user());

    let user_text = context
        .immediate
        .recent_messages
        .iter()
        .filter(|m| m.is_user())
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let topics = topics::classify(&user_text);

    let user_intent = last_user
        .map(|m| detect_intent(&m.content))
        .unwrap_or_else(|| detect_intent(""));

    let emotion = context.immediate.current_emotion;
    let emotional_tone = EmotionalTone {
        emotion,
        intensity: clamp_unit(intensity),
        trend,
        tone: ToneAdjustment::for_emotion(emotion),
    };

    let relevance_score = clamp_unit(
        MEMORY_WEIGHT * memories.relevance_score
            + TOPIC_WEIGHT * topic_alignment(context)
            + FRESHNESS_WEIGHT * freshness(context),
    );

    let recommendations = recommendations(context, memories, &emotional_tone, &user_intent);

    ContextAnalysis {
        context_id: context.id.clone(),
        relevance_score,
        emotional_tone,
        topics,
        user_intent,
        recommendations,
        analyzed_at: Utc::now(),
    }
}

/// Share of active topics the session already cares about; 0.5 when there
/// are no active topics.
fn topic_alignment(context: &Context) -> f64 {
    let active = &context.immediate.active_topics;
    if active.is_empty() {
        return 0.5;
    }
    let known = active
        .iter()
        .filter(|topic| {
            context.session.themes.iter().any(|t| &t.topic == *topic)
                || context
                    .session
                    .user_profile
                    .topic_interests
                    .iter()
                    .any(|i| i == *topic)
        })
        .count();
    known as f64 / active.len() as f64
}

/// 1.0 within five minutes of the last message, falling to 0 at an hour.
fn freshness(context: &Context) -> f64 {
    let Some(last) = context.immediate.recent_messages.last() else {
        return 0.0;
    };
    let minutes = (context.timestamp - last.timestamp).num_seconds().max(0) as f64 / 60.0;
    if minutes <= FRESH_MINUTES {
        1.0
    } else {
        clamp_unit(1.0 - (minutes - FRESH_MINUTES) / (STALE_MINUTES - FRESH_MINUTES))
    }
}

fn recommendations(
    context: &Context,
    memories: &RelevantMemories,
    tone: &EmotionalTone,
    intent: &UserIntent,
) -> Vec<String> {
    let profile = &context.session.user_profile;
    let mut out = vec![tone.tone.guidance.clone()];

    out.push(match intent.intent {
        IntentKind::Question => "Answer the question directly before adding detail".to_string(),
        IntentKind::Request => "Confirm what the user asked for and act on it".to_string(),
        IntentKind::Greeting => match &profile.name {
            Some(name) => format!("Greet {} warmly", name),
            None => "Greet the user warmly".to_string(),
        },
        IntentKind::Farewell => "Close warmly and invite the user back".to_string(),
        IntentKind::Feedback => "Acknowledge the feedback".to_string(),
        IntentKind::Sharing => "Reflect back what the user shared before responding".to_string(),
        IntentKind::Chitchat => "Keep the exchange light and conversational".to_string(),
    });

    if tone.trend == EmotionalTrend::Declining {
        out.push("The user's mood is declining; slow down and check in".to_string());
    }
    let flow = &context.immediate.flow;
    if flow.engagement < 0.3 {
        out.push("Engagement is low; ask an open question".to_string());
    }
    if flow.clarity < 0.5 {
        out.push("Restate the previous answer in simpler terms".to_string());
    }
    match profile.preferences.response_length {
        ResponseLength::Brief => out.push("Keep the response brief".to_string()),
        ResponseLength::Detailed => out.push("Give a detailed response".to_string()),
        ResponseLength::Moderate => {}
    }
    if let Some(liked) = memories
        .learned_preferences
        .iter()
        .find(|p| p.polarity == PreferencePolarity::Like)
    {
        out.push(format!("Reference the user's interest in {}", liked.value));
    }

    let mut seen = std::collections::HashSet::new();
    out.retain(|r| seen.insert(r.clone()));
    out
}
