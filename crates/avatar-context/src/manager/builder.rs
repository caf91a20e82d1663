//! Context assembly.
//!
//! Builds the three context layers from configuration, session state and
//! memory, and keeps the per-session conversation flow and themes current.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::config::ContextSystemConfig;
use crate::emotion::EmotionalAnalysis;
use crate::text::{contains_phrase, word_count};
use crate::topics;
use crate::types::{
    clamp_unit, ChatMessage, Context, ConversationFlow, ConversationPhase, ConversationTheme,
    Emotion, EnvironmentInfo, ImmediateContext, PersonalityTraits, SystemContext, TimeOfDay,
    UserProfile,
};

use super::analysis::{detect_intent, IntentKind};
use super::session::SessionState;

/// Messages considered when computing flow metrics
const FLOW_WINDOW: usize = 5;

/// User messages mined for active topics
const TOPIC_WINDOW: usize = 3;
const MAX_ACTIVE_TOPICS: usize = 5;
const MAX_THEMES: usize = 10;
const MAX_TRIGGERS: usize = 5;

/// Characters at which a message counts as fully "deep"
const DEPTH_CHARS: f64 = 200.0;

/// Reply gaps (seconds) that count as fast and as moderate
const FAST_REPLY_SECS: i64 = 30;
const MODERATE_REPLY_SECS: i64 = 120;

const PROBLEM_CUES: &[&str] = &[
    "problem", "issue", "error", "broken", "fix", "stuck", "doesn't work", "not working", "crash",
];
const CONFUSION_CUES: &[&str] = &["what do you mean", "i don't understand", "i'm lost", "confusing"];

/// Assembles contexts for one manager.
pub struct ContextBuilder {
    system: SystemContext,
    timezone: String,
    tz: Tz,
}

impl ContextBuilder {
    pub fn new(config: &ContextSystemConfig) -> Self {
        let tz = config.timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!("Unknown timezone '{}', using UTC for time of day", config.timezone);
            chrono_tz::UTC
        });
        Self {
            system: config.system_context(),
            timezone: config.timezone.clone(),
            tz,
        }
    }

    pub fn system(&self) -> &SystemContext {
        &self.system
    }

    pub fn personality(&self) -> &PersonalityTraits {
        &self.system.personality
    }

    pub fn set_personality(&mut self, personality: PersonalityTraits) {
        self.system.personality = personality;
    }

    pub fn context_window(&self) -> usize {
        self.system.guidelines.context_window
    }

    /// Build a context snapshot.
    ///
    /// `at` is the timestamp of the message that triggered the build; it
    /// drives the time of day (in the configured timezone) and session
    /// duration. The context itself is
    /// stamped with the build time.
    pub fn build(
        &self,
        session: &SessionState,
        profile: &UserProfile,
        recent_messages: Vec<ChatMessage>,
        emotion: Emotion,
        at: DateTime<Utc>,
    ) -> Context {
        let active_topics = active_topics(&recent_messages);
        Context {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            system: self.system.clone(),
            session: session.session_context(profile),
            immediate: ImmediateContext {
                recent_messages,
                current_emotion: emotion,
                flow: session.flow.clone(),
                active_topics,
                environment: self.environment(session, at),
            },
        }
    }

    pub fn environment(&self, session: &SessionState, at: DateTime<Utc>) -> EnvironmentInfo {
        EnvironmentInfo {
            time_of_day: TimeOfDay::from_hour(at.with_timezone(&self.tz).hour()),
            timezone: self.timezone.clone(),
            session_duration_secs: session.duration_secs(at),
            device: session.environment.device.clone(),
            network: session.environment.network.clone(),
        }
    }
}

/// Topics of the last three user messages, best first, at most five.
pub fn active_topics(messages: &[ChatMessage]) -> Vec<String> {
    let text = messages
        .iter()
        .rev()
        .filter(|m| m.is_user())
        .take(TOPIC_WINDOW)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let mut topics = topics::extract_topics(&text);
    topics.truncate(MAX_ACTIVE_TOPICS);
    topics
}

/// Fold the topics of `text` into the session themes.
///
/// Known themes gain a mention and keep their best confidence; when the
/// list is full the least mentioned theme (oldest on ties) makes room.
pub fn update_themes(themes: &mut Vec<ConversationTheme>, text: &str, at: DateTime<Utc>) {
    for score in topics::classify(text) {
        if let Some(theme) = themes.iter_mut().find(|t| t.topic == score.topic) {
            theme.frequency += 1;
            theme.confidence = theme.confidence.max(score.confidence);
            theme.last_seen = at.max(theme.first_seen);
            continue;
        }

        if themes.len() >= MAX_THEMES {
            let weakest = themes
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.frequency
                        .cmp(&b.frequency)
                        .then(a.last_seen.cmp(&b.last_seen))
                })
                .map(|(i, _)| i);
            if let Some(i) = weakest {
                themes.remove(i);
            }
        }
        themes.push(ConversationTheme {
            topic: score.topic,
            confidence: score.confidence,
            frequency: 1,
            first_seen: at,
            last_seen: at,
        });
    }
}

/// Advance the conversation flow after a message.
///
/// - depth: mean user message length against 200 chars (70%) plus how
///   established the strongest theme is (30%)
/// - momentum: share of fast replies among the last five gaps
/// - engagement: 0.3 base plus question share and emotional intensity
/// - clarity: lowered by detected confusion
pub fn next_flow(
    previous: &ConversationFlow,
    messages: &[ChatMessage],
    analysis: Option<&EmotionalAnalysis>,
    themes: &[ConversationTheme],
) -> ConversationFlow {
    let user: Vec<&ChatMessage> = messages
        .iter()
        .rev()
        .filter(|m| m.is_user())
        .take(FLOW_WINDOW)
        .collect();
    if user.is_empty() {
        return previous.clone();
    }

    let mean_chars = user
        .iter()
        .map(|m| m.content.chars().count() as f64)
        .sum::<f64>()
        / user.len() as f64;
    let strongest = themes.iter().map(|t| t.frequency).max().unwrap_or(0);
    let depth = clamp_unit(
        0.7 * (mean_chars / DEPTH_CHARS).min(1.0) + 0.3 * (f64::from(strongest) / 5.0).min(1.0),
    );

    let tail_start = messages.len().saturating_sub(FLOW_WINDOW + 1);
    let gaps: Vec<f64> = messages[tail_start..]
        .windows(2)
        .map(|pair| {
            let secs = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            if secs <= FAST_REPLY_SECS {
                1.0
            } else if secs <= MODERATE_REPLY_SECS {
                0.5
            } else {
                0.0
            }
        })
        .collect();
    let momentum = if gaps.is_empty() {
        0.0
    } else {
        gaps.iter().sum::<f64>() / gaps.len() as f64
    };

    let questions = user.iter().filter(|m| m.content.contains('?')).count();
    let intensity = analysis.map_or(0.0, |a| a.intensity);
    let engagement =
        clamp_unit(0.3 + 0.4 * (questions as f64 / user.len() as f64) + 0.3 * intensity);

    let latest = user[0];
    let lower = latest.content.to_lowercase();
    let mut clarity = 1.0;
    if let Some(a) = analysis.filter(|a| a.detected_emotion == Emotion::Confused) {
        clarity -= 0.6 * a.confidence;
    }
    if CONFUSION_CUES.iter().any(|cue| contains_phrase(&lower, cue)) {
        clarity -= 0.3;
    }
    let clarity = clamp_unit(clarity);

    let (phase, trigger) = next_phase(&lower, &latest.content, user.len(), depth, messages);

    let mut transition_triggers = previous.transition_triggers.clone();
    if phase != previous.phase {
        transition_triggers.push(format!(
            "{} -> {}: {}",
            previous.phase.as_str(),
            phase.as_str(),
            trigger
        ));
        let excess = transition_triggers.len().saturating_sub(MAX_TRIGGERS);
        transition_triggers.drain(..excess);
    }

    ConversationFlow {
        phase,
        momentum,
        depth,
        engagement,
        clarity,
        transition_triggers,
    }
}

fn next_phase(
    lower: &str,
    content: &str,
    recent_user_messages: usize,
    depth: f64,
    messages: &[ChatMessage],
) -> (ConversationPhase, &'static str) {
    let intent = detect_intent(content).intent;
    let total_user = messages.iter().filter(|m| m.is_user()).count();

    if intent == IntentKind::Farewell {
        return (ConversationPhase::Closing, "farewell");
    }
    if PROBLEM_CUES.iter().any(|cue| contains_phrase(lower, cue)) {
        return (ConversationPhase::ProblemSolving, "problem reported");
    }
    if intent == IntentKind::Greeting && total_user <= 2 {
        return (ConversationPhase::Greeting, "greeting");
    }
    if depth >= 0.6 && recent_user_messages >= 3 && word_count(content) > 10 {
        return (ConversationPhase::DeepDive, "sustained depth");
    }
    if total_user <= 1 {
        return (ConversationPhase::Greeting, "opening message");
    }
    (ConversationPhase::Exploration, "topic exploration")
}
