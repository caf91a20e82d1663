//! Long-term memory: user profile, significant interactions and learned
//! preferences.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{LearnedPreference, PreferencePolarity, SignificantInteraction};
use crate::topics;
use crate::types::{clamp_unit, UserProfile};

/// Confidence of a preference seen once
const INITIAL_PREFERENCE_CONFIDENCE: f64 = 0.6;

/// Confidence added per repeated statement
const PREFERENCE_CONFIDENCE_STEP: f64 = 0.1;

/// Evidence statements kept per preference
const MAX_EVIDENCE: usize = 5;

/// Words kept from a preference value
const MAX_VALUE_WORDS: usize = 4;

static LIKE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bi\s+(?:really\s+|also\s+)?(?:like|love|enjoy|prefer)\s+([^.,!?;\n]+)")
        .expect("Invalid regex pattern")
});

static DISLIKE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bi\s+(?:really\s+)?(?:hate|dislike|don't like|do not like|can't stand)\s+([^.,!?;\n]+)",
    )
    .expect("Invalid regex pattern")
});

/// A preference statement found in text.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceStatement {
    pub value: String,
    pub polarity: PreferencePolarity,
}

/// Find "I like X" / "I don't like X" style statements.
pub fn extract_preferences(text: &str) -> Vec<PreferenceStatement> {
    let patterns = [
        (&*LIKE_PATTERN, PreferencePolarity::Like),
        (&*DISLIKE_PATTERN, PreferencePolarity::Dislike),
    ];

    let mut found = Vec::new();
    for (pattern, polarity) in patterns {
        for captures in pattern.captures_iter(text) {
            let Some(raw) = captures.get(1) else {
                continue;
            };
            let value = normalize_value(raw.as_str());
            if !value.is_empty() {
                found.push(PreferenceStatement { value, polarity });
            }
        }
    }
    found
}

fn normalize_value(raw: &str) -> String {
    raw.split_whitespace()
        .take(MAX_VALUE_WORDS)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Durable-for-session knowledge about the user.
#[derive(Debug, Clone)]
pub struct LongTermMemory {
    profile: UserProfile,
    interactions: Vec<SignificantInteraction>,
    preferences: Vec<LearnedPreference>,
    capacity: usize,
}

impl LongTermMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            profile: UserProfile::default(),
            interactions: Vec::new(),
            preferences: Vec::new(),
            capacity,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut UserProfile {
        &mut self.profile
    }

    pub fn interactions(&self) -> &[SignificantInteraction] {
        &self.interactions
    }

    pub fn preferences(&self) -> &[LearnedPreference] {
        &self.preferences
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a significant interaction.
    ///
    /// When full, the lowest-impact interaction is dropped (oldest on ties).
    /// Returns false if the new record itself was the one dropped.
    pub fn record_interaction(&mut self, interaction: SignificantInteraction) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.interactions.len() < self.capacity {
            self.interactions.push(interaction);
            return true;
        }

        let weakest = self
            .interactions
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, r)| match best {
                Some((_, impact)) if impact <= r.impact => best,
                _ => Some((i, r.impact)),
            });

        match weakest {
            Some((index, impact)) if impact < interaction.impact => {
                self.interactions.remove(index);
                self.interactions.push(interaction);
                true
            }
            _ => false,
        }
    }

    /// Fold a preference statement into the learned preferences.
    pub fn learn_preference(
        &mut self,
        statement: PreferenceStatement,
        evidence: &str,
        now: DateTime<Utc>,
    ) {
        if let Some(existing) = self
            .preferences
            .iter_mut()
            .find(|p| p.value == statement.value && p.polarity == statement.polarity)
        {
            existing.confidence = clamp_unit(existing.confidence + PREFERENCE_CONFIDENCE_STEP);
            existing.evidence.push(evidence.to_string());
            if existing.evidence.len() > MAX_EVIDENCE {
                existing.evidence.remove(0);
            }
            existing.last_updated = now;
            return;
        }

        // A reversed opinion replaces the old one
        self.preferences
            .retain(|p| p.value != statement.value || p.polarity == statement.polarity);

        if self.capacity > 0 && self.preferences.len() >= self.capacity {
            let weakest = self
                .preferences
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.confidence
                        .total_cmp(&b.confidence)
                        .then(a.last_updated.cmp(&b.last_updated))
                })
                .map(|(i, _)| i);
            if let Some(index) = weakest {
                self.preferences.remove(index);
            }
        }

        let category = topics::classify(&statement.value)
            .into_iter()
            .next()
            .map(|t| t.topic)
            .unwrap_or_else(|| "general".to_string());

        self.preferences.push(LearnedPreference {
            category,
            value: statement.value,
            polarity: statement.polarity,
            confidence: INITIAL_PREFERENCE_CONFIDENCE,
            evidence: vec![evidence.to_string()],
            last_updated: now,
        });
    }

    /// Update interaction history with one user message.
    ///
    /// `sentiment` is in `[0, 1]` with 0.5 neutral.
    pub fn record_user_message(&mut self, at: DateTime<Utc>, sentiment: f64) {
        let history = &mut self.profile.interaction_history;
        history.total_messages += 1;
        if history.first_interaction.is_none() {
            history.first_interaction = Some(at);
        }
        history.last_interaction = Some(at);
        let n = history.total_messages as f64;
        history.average_sentiment =
            clamp_unit(history.average_sentiment + (clamp_unit(sentiment) - history.average_sentiment) / n);
    }

    /// Wipe the tier unless the profile is preserved.
    pub fn clear(&mut self, preserve_profile: bool) {
        if preserve_profile {
            return;
        }
        self.profile = UserProfile::default();
        self.interactions.clear();
        self.preferences.clear();
    }
}
