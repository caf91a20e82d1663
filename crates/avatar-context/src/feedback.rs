//! User feedback on avatar responses.
//!
//! Ratings in `[0, 1]` are recorded per category against the context that
//! produced the response. Sustained low ratings in a category turn into
//! small, bounded personality adjustments.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{clamp_unit, PersonalityTraits};

/// Entries kept before the oldest are dropped
const FEEDBACK_CAPACITY: usize = 500;

/// Ratings per category considered when suggesting adjustments
const ADJUSTMENT_WINDOW: usize = 10;

/// Ratings needed in the window before anything is suggested
const MIN_SAMPLES: usize = 3;

/// Average rating below which a category asks for an adjustment
const LOW_RATING: f64 = 0.4;

/// Largest change to a single trait per suggestion
const MAX_STEP: f64 = 0.1;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Rating must be between 0 and 1, got {0}")]
    InvalidRating(f64),

    #[error("Feedback must reference a context id")]
    MissingContextId,
}

pub type FeedbackResult<T> = std::result::Result<T, FeedbackError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Tone,
    Relevance,
    Length,
    Empathy,
    General,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 5] = [
        FeedbackCategory::Tone,
        FeedbackCategory::Relevance,
        FeedbackCategory::Length,
        FeedbackCategory::Empathy,
        FeedbackCategory::General,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityTrait {
    Warmth,
    Energy,
    Formality,
    Empathy,
    Humor,
    Curiosity,
}

impl PersonalityTrait {
    fn slot(self, traits: &mut PersonalityTraits) -> &mut f64 {
        match self {
            PersonalityTrait::Warmth => &mut traits.warmth,
            PersonalityTrait::Energy => &mut traits.energy,
            PersonalityTrait::Formality => &mut traits.formality,
            PersonalityTrait::Empathy => &mut traits.empathy,
            PersonalityTrait::Humor => &mut traits.humor,
            PersonalityTrait::Curiosity => &mut traits.curiosity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: String,
    pub context_id: String,
    pub category: FeedbackCategory,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAggregate {
    pub category: FeedbackCategory,
    pub count: usize,
    /// Mean rating, 0 when there are no ratings
    pub average_rating: f64,
}

/// A suggested change to one personality trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityAdjustment {
    pub personality_trait: PersonalityTrait,
    /// Signed change, within `[-0.1, 0.1]`
    pub delta: f64,
    pub reason: String,
}

/// Apply adjustments to a trait set, clamping every trait into `[0, 1]`.
pub fn apply_adjustments(traits: &mut PersonalityTraits, adjustments: &[PersonalityAdjustment]) {
    for adjustment in adjustments {
        let slot = adjustment.personality_trait.slot(traits);
        *slot = clamp_unit(*slot + adjustment.delta);
    }
}

/// Bounded log of feedback entries.
#[derive(Debug, Default)]
pub struct FeedbackStore {
    entries: VecDeque<FeedbackEntry>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        context_id: &str,
        category: FeedbackCategory,
        rating: f64,
        comment: Option<String>,
    ) -> FeedbackResult<FeedbackEntry> {
        if context_id.trim().is_empty() {
            return Err(FeedbackError::MissingContextId);
        }
        if !(0.0..=1.0).contains(&rating) {
            return Err(FeedbackError::InvalidRating(rating));
        }

        let entry = FeedbackEntry {
            id: uuid::Uuid::new_v4().to_string(),
            context_id: context_id.to_string(),
            category,
            rating,
            comment,
            timestamp: Utc::now(),
        };
        if self.entries.len() >= FEEDBACK_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        debug!("Recorded {:?} feedback {:.2} for {}", category, rating, context_id);
        Ok(entry)
    }

    pub fn for_context(&self, context_id: &str) -> Vec<&FeedbackEntry> {
        self.entries
            .iter()
            .filter(|e| e.context_id == context_id)
            .collect()
    }

    pub fn aggregate(&self, category: FeedbackCategory) -> FeedbackAggregate {
        let ratings: Vec<f64> = self
            .entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.rating)
            .collect();
        FeedbackAggregate {
            category,
            count: ratings.len(),
            average_rating: mean(&ratings),
        }
    }

    pub fn aggregates(&self) -> Vec<FeedbackAggregate> {
        FeedbackCategory::ALL
            .iter()
            .map(|&c| self.aggregate(c))
            .collect()
    }

    /// Adjustments for one category, from its last ten ratings.
    ///
    /// Nothing is suggested until three ratings exist or while the windowed
    /// average is at least 0.4. The step grows linearly as the average
    /// falls toward zero, up to 0.1.
    pub fn suggest_adjustments(&self, category: FeedbackCategory) -> Vec<PersonalityAdjustment> {
        let window: Vec<f64> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.category == category)
            .take(ADJUSTMENT_WINDOW)
            .map(|e| e.rating)
            .collect();
        if window.len() < MIN_SAMPLES {
            return Vec::new();
        }
        let average = mean(&window);
        if average >= LOW_RATING {
            return Vec::new();
        }

        let step = MAX_STEP * (LOW_RATING - average) / LOW_RATING;
        let reason = format!(
            "{:?} feedback averaged {:.2} over {} ratings",
            category,
            average,
            window.len()
        )
        .to_lowercase();
        let adjust = |personality_trait: PersonalityTrait, sign: f64| PersonalityAdjustment {
            personality_trait,
            delta: sign * step,
            reason: reason.clone(),
        };

        match category {
            FeedbackCategory::Tone => vec![
                adjust(PersonalityTrait::Warmth, 1.0),
                adjust(PersonalityTrait::Formality, -1.0),
            ],
            FeedbackCategory::Empathy => vec![adjust(PersonalityTrait::Empathy, 1.0)],
            FeedbackCategory::Relevance => vec![adjust(PersonalityTrait::Curiosity, -1.0)],
            FeedbackCategory::Length => vec![adjust(PersonalityTrait::Energy, -1.0)],
            FeedbackCategory::General => vec![adjust(PersonalityTrait::Humor, -1.0)],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_feedback() {
        let mut store = FeedbackStore::new();
        assert!(matches!(
            store.record("ctx", FeedbackCategory::Tone, 1.5, None),
            Err(FeedbackError::InvalidRating(_))
        ));
        assert!(matches!(
            store.record("ctx", FeedbackCategory::Tone, f64::NAN, None),
            Err(FeedbackError::InvalidRating(_))
        ));
        assert!(matches!(
            store.record(" ", FeedbackCategory::Tone, 0.5, None),
            Err(FeedbackError::MissingContextId)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_aggregates_per_category() {
        let mut store = FeedbackStore::new();
        store.record("a", FeedbackCategory::Tone, 0.2, None).unwrap();
        store.record("b", FeedbackCategory::Tone, 0.6, None).unwrap();
        store
            .record("a", FeedbackCategory::Length, 1.0, Some("just right".into()))
            .unwrap();

        let tone = store.aggregate(FeedbackCategory::Tone);
        assert_eq!(tone.count, 2);
        assert!((tone.average_rating - 0.4).abs() < 1e-9);
        assert_eq!(store.aggregate(FeedbackCategory::Empathy).count, 0);
        assert_eq!(store.aggregates().len(), 5);
        assert_eq!(store.for_context("a").len(), 2);
    }

    #[test]
    fn test_low_tone_ratings_suggest_warmer_less_formal() {
        let mut store = FeedbackStore::new();
        for _ in 0..2 {
            store.record("c", FeedbackCategory::Tone, 0.0, None).unwrap();
        }
        assert!(store.suggest_adjustments(FeedbackCategory::Tone).is_empty());

        store.record("c", FeedbackCategory::Tone, 0.0, None).unwrap();
        let adjustments = store.suggest_adjustments(FeedbackCategory::Tone);
        assert_eq!(adjustments.len(), 2);
        assert_eq!(adjustments[0].personality_trait, PersonalityTrait::Warmth);
        assert!((adjustments[0].delta - MAX_STEP).abs() < 1e-9);
        assert!(adjustments[1].delta < 0.0);
    }

    #[test]
    fn test_good_ratings_suggest_nothing() {
        let mut store = FeedbackStore::new();
        for _ in 0..5 {
            store.record("c", FeedbackCategory::Empathy, 0.9, None).unwrap();
        }
        assert!(store.suggest_adjustments(FeedbackCategory::Empathy).is_empty());
    }

    #[test]
    fn test_apply_adjustments_clamps() {
        let mut traits = PersonalityTraits {
            warmth: 0.95,
            ..Default::default()
        };
        let adjustments = vec![PersonalityAdjustment {
            personality_trait: PersonalityTrait::Warmth,
            delta: 0.1,
            reason: "test".into(),
        }];
        apply_adjustments(&mut traits, &adjustments);
        assert_eq!(traits.warmth, 1.0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut store = FeedbackStore::new();
        for i in 0..(FEEDBACK_CAPACITY + 5) {
            store
                .record(&format!("ctx-{}", i), FeedbackCategory::General, 0.5, None)
                .unwrap();
        }
        assert_eq!(store.len(), FEEDBACK_CAPACITY);
        assert!(store.for_context("ctx-0").is_empty());
    }
}
