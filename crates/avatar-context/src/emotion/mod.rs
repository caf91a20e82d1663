//! Emotional scoring
//!
//! - `lexicon`: keyword dictionaries for the heuristic backend
//! - `scorer`: the [`EmotionScorer`] seam and the keyword backend
//! - `analyzer`: blends text, context and history into one analysis
//! - `tone`: emotion to tone-adjustment mapping

pub mod analyzer;
pub mod lexicon;
pub mod scorer;
pub mod tone;
pub mod types;


pub use analyzer::{EmotionalAnalyzer, ANONYMOUS_USER};
pub use lexicon::EmotionLexicon;
pub use scorer::{EmotionScorer, KeywordEmotionScorer};
pub use tone::ToneAdjustment;
pub use types::{
    EmotionRecord, EmotionScore, EmotionalAnalysis, EmotionalContext, EmotionalTrend,
    SignalSummary, TextEmotionSignal,
};
