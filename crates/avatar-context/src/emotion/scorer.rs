//! Text emotion scoring.
//!
//! [`EmotionScorer`] is the seam between orchestration and the scoring
//! backend. [`KeywordEmotionScorer`] is the built-in heuristic backend:
//!
//! 1. per category, `score = matched / words * sqrt(words)`
//! 2. boosts: emotion name present (x1.8), two or more distinct matches
//!    (x1.4), strong vocabulary (x1.2), very strong vocabulary (x1.5)
//! 3. cap at 1.0; the best category wins, ties go to the first category
//! 4. with no category match, fall back to positive/negative sentiment

use crate::config::ScoringWeights;
use crate::text::{contains_phrase, tokenize};
use crate::types::{clamp_unit, Emotion};

use super::lexicon::EmotionLexicon;
use super::types::{EmotionScore, TextEmotionSignal};

/// Confidence reported for text with no emotional or sentiment words
const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Sentiment score beyond which the fallback picks happy/sad
const SENTIMENT_THRESHOLD: f64 = 0.2;

/// Intensity change per intensifier or diminisher
const MODIFIER_STEP: f64 = 0.1;

/// Intensity added per exclamation mark, and its cap
const EXCLAMATION_STEP: f64 = 0.05;
const EXCLAMATION_CAP: f64 = 0.2;

/// A pluggable emotion scoring backend.
pub trait EmotionScorer: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Score text in isolation.
    fn score_text(&self, text: &str) -> TextEmotionSignal;

    /// Emotionally loaded words per word, in `[0, 1]`.
    fn emotional_density(&self, text: &str) -> f64;

    /// Signed intensity adjustment from intensifiers, diminishers and
    /// exclamation marks.
    fn intensity_modifier(&self, text: &str) -> f64;
}

/// Keyword/heuristic scorer.
#[derive(Debug, Clone)]
pub struct KeywordEmotionScorer {
    lexicon: EmotionLexicon,
    weights: ScoringWeights,
}

impl Default for KeywordEmotionScorer {
    fn default() -> Self {
        Self::new(EmotionLexicon::default(), ScoringWeights::default())
    }
}

impl KeywordEmotionScorer {
    pub fn new(lexicon: EmotionLexicon, weights: ScoringWeights) -> Self {
        Self { lexicon, weights }
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self::new(EmotionLexicon::default(), weights)
    }

    pub fn lexicon(&self) -> &EmotionLexicon {
        &self.lexicon
    }

    /// Positive/negative lexicon fallback.
    fn sentiment_fallback(&self, lower: &str, tokens: &[String]) -> TextEmotionSignal {
        let positive = EmotionLexicon::count_matches(&self.lexicon.positive, lower, tokens);
        let negative = EmotionLexicon::count_matches(&self.lexicon.negative, lower, tokens);
        let total = positive + negative;
        if total == 0 {
            return TextEmotionSignal::neutral(NEUTRAL_CONFIDENCE);
        }

        let sentiment = (positive as f64 - negative as f64) / total as f64;
        let emotion = if sentiment > SENTIMENT_THRESHOLD {
            Emotion::Happy
        } else if sentiment < -SENTIMENT_THRESHOLD {
            Emotion::Sad
        } else {
            Emotion::Neutral
        };

        TextEmotionSignal {
            emotion,
            confidence: clamp_unit(0.3 + 0.4 * sentiment.abs()),
            scores: Vec::new(),
            matched_keywords: Vec::new(),
            used_fallback: true,
        }
    }
}

impl EmotionScorer for KeywordEmotionScorer {
    fn name(&self) -> &str {
        "keyword"
    }

    fn score_text(&self, text: &str) -> TextEmotionSignal {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return TextEmotionSignal::neutral(NEUTRAL_CONFIDENCE);
        }
        let lower = text.to_lowercase();
        let word_count = tokens.len() as f64;

        let has_strong = EmotionLexicon::count_matches(&self.lexicon.strong, &lower, &tokens) > 0;
        let has_very_strong =
            EmotionLexicon::count_matches(&self.lexicon.very_strong, &lower, &tokens) > 0;

        let mut scores = Vec::new();
        let mut matched_keywords = Vec::new();

        for (emotion, keywords) in &self.lexicon.categories {
            let matched = EmotionLexicon::matching(keywords, &lower, &tokens);
            if matched.is_empty() {
                continue;
            }

            let mut score = (matched.len() as f64 / word_count) * word_count.sqrt();
            if contains_phrase(&lower, emotion.as_str()) {
                score *= self.weights.exact_match_boost;
            }
            if matched.len() > 1 {
                score *= self.weights.multi_match_boost;
            }
            if has_strong {
                score *= self.weights.strong_boost;
            }
            if has_very_strong {
                score *= self.weights.very_strong_boost;
            }

            matched_keywords.extend(matched.iter().map(|m| (*m).to_string()));
            scores.push(EmotionScore {
                emotion: *emotion,
                score: score.min(1.0),
            });
        }

        if scores.is_empty() {
            return self.sentiment_fallback(&lower, &tokens);
        }

        // First maximum wins
        let best = scores
            .iter()
            .fold(None::<EmotionScore>, |best, s| match best {
                Some(b) if b.score >= s.score => Some(b),
                _ => Some(*s),
            })
            .unwrap_or(EmotionScore {
                emotion: Emotion::Neutral,
                score: NEUTRAL_CONFIDENCE,
            });

        TextEmotionSignal {
            emotion: best.emotion,
            confidence: clamp_unit(best.score),
            scores,
            matched_keywords,
            used_fallback: false,
        }
    }

    fn emotional_density(&self, text: &str) -> f64 {
        let words = tokenize(text).len();
        if words == 0 {
            return 0.0;
        }
        clamp_unit(self.lexicon.emotional_word_count(text) as f64 / words as f64)
    }

    fn intensity_modifier(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let tokens = tokenize(text);
        let intensifiers =
            EmotionLexicon::count_matches(&self.lexicon.intensifiers, &lower, &tokens) as f64;
        let diminishers =
            EmotionLexicon::count_matches(&self.lexicon.diminishers, &lower, &tokens) as f64;
        let exclamations = text.matches('!').count() as f64;

        MODIFIER_STEP * (intensifiers - diminishers)
            + (EXCLAMATION_STEP * exclamations).min(EXCLAMATION_CAP)
    }
}
