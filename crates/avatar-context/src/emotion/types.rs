//! Emotion analysis types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tone::ToneAdjustment;
use crate::types::Emotion;

/// Score for one emotion category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: Emotion,
    pub score: f64,
}

/// Result of scoring a piece of text in isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmotionSignal {
    pub emotion: Emotion,
    pub confidence: f64,
    /// Non-zero category scores in lexicon order
    pub scores: Vec<EmotionScore>,
    pub matched_keywords: Vec<String>,
    /// True when no category matched and the sentiment lexicon decided
    pub used_fallback: bool,
}

impl TextEmotionSignal {
    pub fn neutral(confidence: f64) -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence,
            scores: Vec::new(),
            matched_keywords: Vec::new(),
            used_fallback: true,
        }
    }
}

/// One weighted signal feeding the blended result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub emotion: Emotion,
    pub confidence: f64,
    pub weight: f64,
}

/// Direction of a user's recent emotional state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalTrend {
    Improving,
    Declining,
    #[default]
    Stable,
}

/// A recorded emotion/intensity pair for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub emotion: Emotion,
    pub intensity: f64,
    pub timestamp: DateTime<Utc>,
}

/// Supporting detail for an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalContext {
    pub secondary_emotion: Option<Emotion>,
    pub intensity: f64,
    pub trend: EmotionalTrend,
    pub text_signal: SignalSummary,
    pub contextual_signal: Option<SignalSummary>,
    pub historical_signal: Option<SignalSummary>,
    pub matched_keywords: Vec<String>,
    pub tone: ToneAdjustment,
}

/// Output of the emotional scorer for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalAnalysis {
    pub detected_emotion: Emotion,
    pub confidence: f64,
    pub intensity: f64,
    pub suggested_response: String,
    pub emotional_context: EmotionalContext,
}

impl EmotionalAnalysis {
    /// Neutral analysis used when nothing better is available.
    pub fn neutral() -> Self {
        let tone = ToneAdjustment::for_emotion(Emotion::Neutral);
        let summary = SignalSummary {
            emotion: Emotion::Neutral,
            confidence: 0.5,
            weight: 1.0,
        };
        Self {
            detected_emotion: Emotion::Neutral,
            confidence: 0.5,
            intensity: 0.5,
            suggested_response: tone.guidance.clone(),
            emotional_context: EmotionalContext {
                secondary_emotion: None,
                intensity: 0.5,
                trend: EmotionalTrend::Stable,
                text_signal: summary,
                contextual_signal: None,
                historical_signal: None,
                matched_keywords: Vec::new(),
                tone,
            },
        }
    }
}
