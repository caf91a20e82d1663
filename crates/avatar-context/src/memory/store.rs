//! Three-tier memory store.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::long_term::{extract_preferences, LongTermMemory};
use super::short_term::ShortTermMemory;
use super::types::{
    LearnedPreference, MemoryStats, MemoryUpdate, RelevantMemories, SignificantInteraction,
    TierUtilization,
};
use super::working::WorkingMemory;
use super::{MemoryError, MemoryResult};
use crate::config::MemoryConfig;
use crate::emotion::{EmotionScorer, EmotionalAnalysis};
use crate::text::{tokenize, truncate};
use crate::topics;
use crate::types::{clamp_unit, ChatMessage, Context, Emotion, ProfileUpdate, UserProfile};

/// Relevance blend
const RECENCY_WEIGHT: f64 = 0.3;
const OVERLAP_WEIGHT: f64 = 0.5;
const SALIENCE_WEIGHT: f64 = 0.2;

/// Characters kept in a significant-interaction summary
const SUMMARY_CHARS: usize = 120;

/// Owner of the short-term, long-term and working tiers.
pub struct MemoryStore {
    config: MemoryConfig,
    scorer: Arc<dyn EmotionScorer>,
    short_term: ShortTermMemory,
    long_term: LongTermMemory,
    working: WorkingMemory,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig, scorer: Arc<dyn EmotionScorer>) -> Self {
        Self {
            short_term: ShortTermMemory::new(config.short_term, config.recent_contexts),
            long_term: LongTermMemory::new(config.long_term),
            working: WorkingMemory::new(config.working_memory),
            scorer,
            config,
        }
    }

    /// Record a message in memory.
    ///
    /// Appends to short-term memory, updates interaction history and learned
    /// preferences for user messages, stores a significant interaction when
    /// the analysis is high-impact, and refreshes the current context.
    pub fn process_message(
        &mut self,
        message: &ChatMessage,
        context: Option<&Context>,
        analysis: Option<&EmotionalAnalysis>,
    ) -> MemoryResult<MemoryUpdate> {
        if message.id.trim().is_empty() {
            return Err(MemoryError::MalformedMessage("message id is empty".to_string()));
        }
        if message.content.trim().is_empty() {
            return Err(MemoryError::MalformedMessage(format!(
                "message {} has no content",
                message.id
            )));
        }

        let mut update = MemoryUpdate {
            short_term_evicted: self.short_term.push_message(message.clone()).is_some(),
            ..Default::default()
        };

        if message.is_user() {
            self.long_term
                .record_user_message(message.timestamp, sentiment_of(analysis));

            for statement in extract_preferences(&message.content) {
                self.long_term
                    .learn_preference(statement, &message.content, message.timestamp);
                update.preferences_learned += 1;
            }

            if let Some(analysis) = analysis {
                update.significant = self.remember_if_significant(message, analysis);
            }
        }

        if let Some(context) = context {
            self.record_context(context.clone());
        }

        Ok(update)
    }

    fn remember_if_significant(&mut self, message: &ChatMessage, analysis: &EmotionalAnalysis) -> bool {
        let impact = clamp_unit(0.6 * analysis.intensity + 0.4 * analysis.confidence);
        if analysis.detected_emotion == Emotion::Neutral
            || impact < self.config.significance_threshold
        {
            return false;
        }

        let stored = self.long_term.record_interaction(SignificantInteraction {
            id: uuid::Uuid::new_v4().to_string(),
            message_id: message.id.clone(),
            timestamp: message.timestamp,
            summary: truncate(&message.content, SUMMARY_CHARS),
            impact,
            emotional_resonance: analysis.detected_emotion,
            topics: topics::extract_topics(&message.content),
        });
        if stored {
            debug!(
                "Stored significant interaction for message {} (impact {:.2})",
                message.id, impact
            );
        }
        stored
    }

    /// Query memory for items related to `query`.
    ///
    /// Each item is scored `0.3 * recency + 0.5 * overlap + 0.2 * salience`;
    /// an empty query matches everything on recency and salience alone.
    pub fn get_relevant_memories(&self, query: &str) -> RelevantMemories {
        let query_terms: HashSet<String> = tokenize(query)
            .into_iter()
            .filter(|t| t.chars().count() > 2)
            .collect();
        let limit = self.config.max_relevant_results;
        let mut scores = Vec::new();

        let total = self.short_term.len();
        let mut messages: Vec<(f64, &ChatMessage)> = self
            .short_term
            .messages()
            .enumerate()
            .filter_map(|(i, m)| {
                let overlap = overlap(&query_terms, &tokenize(&m.content));
                if !query_terms.is_empty() && overlap == 0.0 {
                    return None;
                }
                let salience = self.scorer.emotional_density(&m.content);
                Some((blend(rank(i, total), overlap, salience), m))
            })
            .collect();
        sort_desc(&mut messages);
        messages.truncate(limit);

        let total = self.long_term.interactions().len();
        let mut interactions: Vec<(f64, &SignificantInteraction)> = self
            .long_term
            .interactions()
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let mut terms = tokenize(&r.summary);
                terms.extend(r.topics.iter().cloned());
                let overlap = overlap(&query_terms, &terms);
                if !query_terms.is_empty() && overlap == 0.0 {
                    return None;
                }
                Some((blend(rank(i, total), overlap, r.impact), r))
            })
            .collect();
        sort_desc(&mut interactions);
        interactions.truncate(limit);

        let total = self.long_term.preferences().len();
        let mut preferences: Vec<(f64, &LearnedPreference)> = self
            .long_term
            .preferences()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let mut terms = tokenize(&p.value);
                terms.push(p.category.clone());
                let overlap = overlap(&query_terms, &terms);
                if !query_terms.is_empty() && overlap == 0.0 {
                    return None;
                }
                Some((blend(rank(i, total), overlap, p.confidence), p))
            })
            .collect();
        sort_desc(&mut preferences);
        preferences.truncate(limit);

        scores.extend(messages.iter().map(|(s, _)| *s));
        scores.extend(interactions.iter().map(|(s, _)| *s));
        scores.extend(preferences.iter().map(|(s, _)| *s));
        let relevance_score = if scores.is_empty() {
            0.0
        } else {
            clamp_unit(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        RelevantMemories {
            recent_messages: messages.into_iter().map(|(_, m)| m.clone()).collect(),
            significant_interactions: interactions.into_iter().map(|(_, r)| r.clone()).collect(),
            learned_preferences: preferences.into_iter().map(|(_, p)| p.clone()).collect(),
            relevance_score,
        }
    }

    /// Wipe short-term and working memory; long-term memory survives only
    /// when `preserve_profile` is set.
    pub fn clear_memories(&mut self, preserve_profile: bool) {
        self.short_term.clear();
        self.working.clear();
        self.long_term.clear(preserve_profile);
        debug!("Cleared memories (preserve_profile: {})", preserve_profile);
    }

    pub fn get_memory_stats(&self) -> MemoryStats {
        let memory_usage = self.short_term.messages().map(json_len).sum::<usize>()
            + self.short_term.contexts().map(json_len).sum::<usize>()
            + self.long_term.interactions().iter().map(json_len).sum::<usize>()
            + self.long_term.preferences().iter().map(json_len).sum::<usize>()
            + json_len(self.long_term.profile())
            + self.working.current_context().map(json_len).unwrap_or(0);

        MemoryStats {
            short_term: TierUtilization::new(self.short_term.len(), self.short_term.capacity()),
            long_term: TierUtilization::new(
                self.long_term.interactions().len(),
                self.long_term.capacity(),
            ),
            working: TierUtilization::new(self.working.len(), self.working.capacity()),
            recent_contexts: self.short_term.context_count(),
            learned_preferences: self.long_term.preferences().len(),
            active_processes: self.working.active_processes().len(),
            memory_usage,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        self.long_term.profile()
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) {
        self.long_term.profile_mut().apply(update);
    }

    /// The last `n` messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> Vec<ChatMessage> {
        self.short_term.recent(n)
    }

    pub fn current_context(&self) -> Option<&Context> {
        self.working.current_context()
    }

    pub fn set_current_context(&mut self, context: Context) {
        self.working.set_current_context(context);
    }

    /// Make `context` current and keep it among the recent contexts.
    pub fn record_context(&mut self, context: Context) {
        self.short_term.push_context(context.clone());
        self.working.set_current_context(context);
    }

    pub fn learned_preferences(&self) -> &[LearnedPreference] {
        self.long_term.preferences()
    }

    pub fn significant_interactions(&self) -> &[SignificantInteraction] {
        self.long_term.interactions()
    }

    pub fn working(&self) -> &WorkingMemory {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut WorkingMemory {
        &mut self.working
    }
}

/// Map an analysis to a `[0, 1]` sentiment with 0.5 neutral.
fn sentiment_of(analysis: Option<&EmotionalAnalysis>) -> f64 {
    match analysis {
        Some(a) if a.detected_emotion.is_positive() => 0.5 + 0.5 * a.intensity,
        Some(a) if a.detected_emotion.is_negative() => 0.5 - 0.5 * a.intensity,
        _ => 0.5,
    }
}

fn overlap(query: &HashSet<String>, terms: &[String]) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let terms: HashSet<&str> = terms.iter().map(String::as_str).collect();
    let shared = query.iter().filter(|q| terms.contains(q.as_str())).count();
    shared as f64 / query.len() as f64
}

fn rank(index: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (index + 1) as f64 / total as f64
    }
}

fn blend(recency: f64, overlap: f64, salience: f64) -> f64 {
    clamp_unit(
        RECENCY_WEIGHT * recency + OVERLAP_WEIGHT * overlap + SALIENCE_WEIGHT * clamp_unit(salience),
    )
}

fn sort_desc<T>(items: &mut [(f64, T)]) {
    items.sort_by(|a, b| b.0.total_cmp(&a.0));
}

fn json_len<T: serde::Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0)
}
