//! Emotional state analysis.
//!
//! Blends three signals into one primary emotion:
//!
//! - text analysis of the current message (weight 0.6)
//! - the short-term trend of the last few user messages in the context (0.3)
//! - the user's historical emotion pattern (0.1)
//!
//! Each signal adds `weight * confidence` to its emotion; the argmax wins,
//! ties going to the signal added first. Confidence is the winner's total
//! over the weights of the signals that were present, boosted when text and
//! context agree and penalized when they disagree.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::scorer::EmotionScorer;
use super::tone::ToneAdjustment;
use super::types::{
    EmotionRecord, EmotionalAnalysis, EmotionalContext, EmotionalTrend, SignalSummary,
};
use crate::config::ScoringWeights;
use crate::types::{clamp_unit, ChatMessage, Context, Emotion};

/// User id used when no context is supplied
pub const ANONYMOUS_USER: &str = "anonymous";

/// Records kept per user
const HISTORY_LIMIT: usize = 50;

/// Records considered for the historical pattern
const PATTERN_WINDOW: usize = 20;

/// Records considered for the trend
const TREND_WINDOW: usize = 5;

/// Recency weights for the contextual signal, newest first
const RECENCY_WEIGHTS: [f64; 3] = [1.0, 0.8, 0.6];

/// Emotional scorer combining text, context and per-user history.
pub struct EmotionalAnalyzer {
    scorer: Arc<dyn EmotionScorer>,
    weights: ScoringWeights,
    history: HashMap<String, VecDeque<EmotionRecord>>,
}

impl EmotionalAnalyzer {
    pub fn new(scorer: Arc<dyn EmotionScorer>, weights: ScoringWeights) -> Self {
        Self {
            scorer,
            weights,
            history: HashMap::new(),
        }
    }

    pub fn scorer(&self) -> &Arc<dyn EmotionScorer> {
        &self.scorer
    }

    /// Analyze text against an optional context and record the result in
    /// the history of the context's user (or [`ANONYMOUS_USER`]).
    ///
    /// Every user message in `context` feeds the contextual signal, so the
    /// context should predate the text.
    pub fn analyze_emotional_state(
        &mut self,
        text: &str,
        context: Option<&Context>,
    ) -> EmotionalAnalysis {
        let user_id = context
            .map(|c| c.session.user_profile.user_id.clone())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());
        self.analyze(&user_id, text, context, None)
    }

    /// Analyze a chat message for a known user.
    ///
    /// The message itself is skipped (by id) if `context` already holds it.
    pub fn analyze_message(
        &mut self,
        user_id: &str,
        message: &ChatMessage,
        context: Option<&Context>,
    ) -> EmotionalAnalysis {
        self.analyze(user_id, &message.content, context, Some(&message.id))
    }

    fn analyze(
        &mut self,
        user_id: &str,
        text: &str,
        context: Option<&Context>,
        current_id: Option<&str>,
    ) -> EmotionalAnalysis {
        let text_signal = self.scorer.score_text(text);
        let text_summary = SignalSummary {
            emotion: text_signal.emotion,
            confidence: text_signal.confidence,
            weight: self.weights.text_weight,
        };
        let contextual = context.and_then(|c| self.contextual_signal(c, current_id));
        let historical = self.historical_signal(user_id);

        let mut candidates: Vec<(Emotion, f64)> = Vec::new();
        let mut present_weight = 0.0;
        for signal in std::iter::once(&text_summary)
            .chain(contextual.as_ref())
            .chain(historical.as_ref())
        {
            add_candidate(&mut candidates, signal.emotion, signal.weight * signal.confidence);
            present_weight += signal.weight;
        }

        let (primary, primary_total) = first_max(&candidates).unwrap_or((Emotion::Neutral, 0.0));
        let mut confidence = if present_weight > 0.0 {
            primary_total / present_weight
        } else {
            0.0
        };

        if let Some(ctx) = &contextual {
            if ctx.emotion == text_summary.emotion {
                confidence *= self.weights.agreement_boost;
            } else if ctx.emotion != Emotion::Neutral && text_summary.emotion != Emotion::Neutral {
                confidence *= self.weights.disagreement_penalty;
            }
        }
        let confidence = clamp_unit(confidence);

        let secondary_emotion = candidates
            .iter()
            .filter(|(e, score)| *e != primary && *score > 0.0)
            .fold(None::<(Emotion, f64)>, |best, &(e, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((e, s)),
            })
            .map(|(e, _)| e);

        let intensity = clamp_unit(confidence + self.scorer.intensity_modifier(text));

        self.record(user_id, primary, intensity);
        let trend = self.emotional_trend(user_id);
        let tone = ToneAdjustment::for_emotion(primary);
        let suggested_response = suggested_response(&tone, primary, trend);

        debug!(
            "Detected {} (confidence {:.2}, intensity {:.2}) for user {}",
            primary, confidence, intensity, user_id
        );

        EmotionalAnalysis {
            detected_emotion: primary,
            confidence,
            intensity,
            suggested_response,
            emotional_context: EmotionalContext {
                secondary_emotion,
                intensity,
                trend,
                text_signal: text_summary,
                contextual_signal: contextual,
                historical_signal: historical,
                matched_keywords: text_signal.matched_keywords,
                tone,
            },
        }
    }

    /// Trend over the user's last five recorded emotions.
    pub fn emotional_trend(&self, user_id: &str) -> EmotionalTrend {
        let Some(records) = self.history.get(user_id) else {
            return EmotionalTrend::Stable;
        };
        if records.len() < 2 {
            return EmotionalTrend::Stable;
        }

        let recent = records.iter().rev().take(TREND_WINDOW);
        let (positive, negative) = recent.fold((0usize, 0usize), |(p, n), r| {
            (
                p + usize::from(r.emotion.is_positive()),
                n + usize::from(r.emotion.is_negative()),
            )
        });

        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => EmotionalTrend::Improving,
            std::cmp::Ordering::Less => EmotionalTrend::Declining,
            std::cmp::Ordering::Equal => EmotionalTrend::Stable,
        }
    }

    /// Recorded emotions for a user, oldest first.
    pub fn user_history(&self, user_id: &str) -> Vec<EmotionRecord> {
        self.history
            .get(user_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_history(&mut self, user_id: &str) {
        self.history.remove(user_id);
    }

    pub fn clear_all_history(&mut self) {
        self.history.clear();
    }

    fn record(&mut self, user_id: &str, emotion: Emotion, intensity: f64) {
        let records = self.history.entry(user_id.to_string()).or_default();
        records.push_back(EmotionRecord {
            emotion,
            intensity,
            timestamp: Utc::now(),
        });
        while records.len() > HISTORY_LIMIT {
            records.pop_front();
        }
    }

    /// Short-term signal from the last few user messages in the context,
    /// leaving out the message being analyzed.
    fn contextual_signal(
        &self,
        context: &Context,
        current_id: Option<&str>,
    ) -> Option<SignalSummary> {
        let user_messages = context
            .immediate
            .recent_messages
            .iter()
            .rev()
            .filter(|m| m.is_user() && Some(m.id.as_str()) != current_id);

        let mut candidates: Vec<(Emotion, f64)> = Vec::new();
        let mut weight_sum = 0.0;
        for (message, weight) in user_messages.zip(RECENCY_WEIGHTS) {
            let signal = self.scorer.score_text(&message.content);
            add_candidate(&mut candidates, signal.emotion, weight * signal.confidence);
            weight_sum += weight;
        }

        let (emotion, total) = first_max(&candidates)?;
        Some(SignalSummary {
            emotion,
            confidence: clamp_unit(total / weight_sum),
            weight: self.weights.contextual_weight,
        })
    }

    /// Dominant emotion in the user's recent history.
    fn historical_signal(&self, user_id: &str) -> Option<SignalSummary> {
        let records = self.history.get(user_id)?;
        if records.is_empty() {
            return None;
        }

        let window: Vec<&EmotionRecord> = records.iter().rev().take(PATTERN_WINDOW).collect();
        let counts: Vec<(Emotion, f64)> = Emotion::ALL
            .iter()
            .map(|e| (*e, window.iter().filter(|r| r.emotion == *e).count() as f64))
            .filter(|(_, count)| *count > 0.0)
            .collect();

        let (emotion, count) = first_max(&counts)?;
        Some(SignalSummary {
            emotion,
            confidence: clamp_unit(count / window.len() as f64),
            weight: self.weights.historical_weight,
        })
    }
}

fn add_candidate(candidates: &mut Vec<(Emotion, f64)>, emotion: Emotion, value: f64) {
    match candidates.iter_mut().find(|(e, _)| *e == emotion) {
        Some((_, total)) => *total += value,
        None => candidates.push((emotion, value)),
    }
}

/// First entry with the maximum value.
fn first_max(candidates: &[(Emotion, f64)]) -> Option<(Emotion, f64)> {
    candidates.iter().fold(None, |best, &(e, v)| match best {
        Some((_, b)) if b >= v => best,
        _ => Some((e, v)),
    })
}

fn suggested_response(tone: &ToneAdjustment, emotion: Emotion, trend: EmotionalTrend) -> String {
    if trend == EmotionalTrend::Declining && emotion.is_negative() {
        format!(
            "{}. Their mood has been sliding over the last few messages, so prioritise support.",
            tone.guidance
        )
    } else {
        tone.guidance.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::context_cache::tests::sample_context;
    use crate::emotion::KeywordEmotionScorer;
    use crate::types::ChatMessage;

    fn analyzer() -> EmotionalAnalyzer {
        EmotionalAnalyzer::new(
            Arc::new(KeywordEmotionScorer::default()),
            ScoringWeights::default(),
        )
    }

    fn context_with(messages: &[&str]) -> Context {
        let mut context = sample_context("ctx");
        context.immediate.recent_messages =
            messages.iter().map(|m| ChatMessage::user(*m)).collect();
        context
    }

    #[test]
    fn test_text_only_analysis() {
        let mut analyzer = analyzer();
        let analysis = analyzer.analyze_emotional_state("I'm absolutely thrilled about this!", None);
        assert_eq!(analysis.detected_emotion, Emotion::Excited);
        assert!(analysis.confidence > 0.5);
        assert!(analysis.emotional_context.contextual_signal.is_none());
        assert!(analysis.emotional_context.historical_signal.is_none());
    }

    #[test]
    fn test_agreeing_context_boosts_confidence() {
        let mut plain = analyzer();
        let baseline = plain.analyze_emotional_state("I feel sad about the news from home today", None);

        let mut with_context = analyzer();
        let context = context_with(&["I am so sad", "everything feels hopeless"]);
        let boosted = with_context
            .analyze_emotional_state("I feel sad about the news from home today", Some(&context));

        assert_eq!(boosted.detected_emotion, Emotion::Sad);
        assert!(boosted.confidence > baseline.confidence);
    }

    #[test]
    fn test_disagreeing_context_penalizes_confidence() {
        let mut plain = analyzer();
        let baseline = plain.analyze_emotional_state("I'm glad it worked out in the end", None);

        let mut with_context = analyzer();
        let context = context_with(&["I'm furious", "so angry right now"]);
        let analysis =
            with_context.analyze_emotional_state("I'm glad it worked out in the end", Some(&context));

        assert!(analysis.confidence < baseline.confidence);
    }

    #[test]
    fn test_current_message_not_counted_as_context() {
        let mut analyzer = analyzer();
        let message = ChatMessage::user("I'm absolutely thrilled about this!");
        let mut context = sample_context("ctx");
        context.immediate.recent_messages = vec![message.clone()];

        let analysis = analyzer.analyze_message("u1", &message, Some(&context));
        assert!(analysis.emotional_context.contextual_signal.is_none());
    }

    #[test]
    fn test_repeated_text_still_counts_as_context() {
        let mut analyzer = analyzer();
        let earlier = ChatMessage::user("I'm so sad");
        let current = ChatMessage::user("I'm so sad");
        let mut context = sample_context("ctx");
        context.immediate.recent_messages = vec![earlier, current.clone()];

        let analysis = analyzer.analyze_message("u1", &current, Some(&context));
        let contextual = analysis.emotional_context.contextual_signal.unwrap();
        assert_eq!(contextual.emotion, Emotion::Sad);
    }

    #[test]
    fn test_history_is_keyed_by_given_user() {
        let mut analyzer = analyzer();
        let context = sample_context("ctx");
        for text in ["I'm so sad", "I'm sad and upset"] {
            analyzer.analyze_message("u1", &ChatMessage::user(text), Some(&context));
        }
        assert_eq!(analyzer.user_history("u1").len(), 2);
        assert!(analyzer.user_history(ANONYMOUS_USER).is_empty());
        assert_eq!(analyzer.emotional_trend("u1"), EmotionalTrend::Declining);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let mut analyzer = analyzer();
        for text in ["!!!!!!!!!!", "REALLY VERY EXTREMELY ANGRY FURIOUS!!!", "", "slightly kind of sad"] {
            let analysis = analyzer.analyze_emotional_state(text, None);
            assert!((0.0..=1.0).contains(&analysis.confidence));
            assert!((0.0..=1.0).contains(&analysis.intensity));
        }
    }

    #[test]
    fn test_repeated_analysis_is_deterministic() {
        let mut analyzer = analyzer();
        let context = context_with(&["hello there"]);
        let first = analyzer.analyze_emotional_state("I'm worried about my exam", Some(&context));
        for _ in 0..5 {
            let again = analyzer.analyze_emotional_state("I'm worried about my exam", Some(&context));
            assert_eq!(again.detected_emotion, first.detected_emotion);
        }
    }

    #[test]
    fn test_trend_declining() {
        let mut analyzer = analyzer();
        analyzer.analyze_emotional_state("I'm so happy", None);
        for _ in 0..4 {
            analyzer.analyze_emotional_state("I'm sad and upset", None);
        }
        assert_eq!(analyzer.emotional_trend(ANONYMOUS_USER), EmotionalTrend::Declining);
    }

    #[test]
    fn test_trend_improving_and_stable() {
        let mut analyzer = analyzer();
        assert_eq!(analyzer.emotional_trend(ANONYMOUS_USER), EmotionalTrend::Stable);
        for _ in 0..3 {
            analyzer.analyze_emotional_state("thanks, I'm grateful", None);
        }
        assert_eq!(analyzer.emotional_trend(ANONYMOUS_USER), EmotionalTrend::Improving);
    }

    #[test]
    fn test_history_is_bounded_and_clearable() {
        let mut analyzer = analyzer();
        for _ in 0..(HISTORY_LIMIT + 10) {
            analyzer.analyze_emotional_state("ok", None);
        }
        assert_eq!(analyzer.user_history(ANONYMOUS_USER).len(), HISTORY_LIMIT);
        analyzer.clear_history(ANONYMOUS_USER);
        assert!(analyzer.user_history(ANONYMOUS_USER).is_empty());
    }

    #[test]
    fn test_tone_follows_primary_emotion() {
        let mut analyzer = analyzer();
        let analysis = analyzer.analyze_emotional_state("I'm so nervous and scared", None);
        assert_eq!(analysis.detected_emotion, Emotion::Anxious);
        assert!(analysis.emotional_context.tone.empathy_delta > 0.0);
    }
}
