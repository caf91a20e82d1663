//! Keyword topic taxonomy.
//!
//! Used for active topics, conversation themes, compression key points and
//! topic classification in context analysis.

use serde::{Deserialize, Serialize};

use crate::text::{contains_phrase, tokenize};

/// Topic name and the keywords that signal it.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "computer", "software", "code", "coding", "programming", "app", "internet", "ai",
            "robot", "tech", "phone", "laptop", "bug", "rust",
        ],
    ),
    (
        "music",
        &["music", "song", "songs", "band", "concert", "album", "guitar", "piano", "sing", "playlist"],
    ),
    (
        "travel",
        &["travel", "trip", "vacation", "flight", "hotel", "beach", "journey", "country", "visit"],
    ),
    (
        "food",
        &["food", "cook", "cooking", "recipe", "dinner", "lunch", "breakfast", "restaurant", "pizza", "eat"],
    ),
    (
        "sports",
        &["sport", "sports", "football", "soccer", "basketball", "tennis", "game", "team", "match", "gym"],
    ),
    (
        "health",
        &["health", "doctor", "sick", "exercise", "sleep", "tired", "stress", "diet", "workout"],
    ),
    (
        "work",
        &["work", "job", "boss", "meeting", "project", "deadline", "office", "career", "colleague"],
    ),
    (
        "education",
        &["school", "study", "exam", "class", "homework", "learn", "learning", "university", "teacher"],
    ),
    (
        "entertainment",
        &["movie", "movies", "film", "show", "series", "book", "books", "netflix", "anime"],
    ),
    (
        "relationships",
        &["friend", "friends", "family", "partner", "girlfriend", "boyfriend", "wife", "husband", "mom", "dad"],
    ),
    (
        "weather",
        &["weather", "rain", "sunny", "snow", "cold", "hot", "storm", "forecast"],
    ),
    (
        "gaming",
        &["gaming", "videogame", "console", "playstation", "xbox", "nintendo", "level", "quest"],
    ),
];

/// A topic detected in text, with a 0-1 confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScore {
    pub topic: String,
    pub confidence: f64,
}

/// Score every topic that has at least one keyword hit, best first.
///
/// Confidence grows with the number of distinct keyword hits: one hit is
/// 0.5, each further hit adds 0.2, capped at 1.0.
pub fn classify(text: &str) -> Vec<TopicScore> {
    let lower = text.to_lowercase();
    let tokens = tokenize(text);

    let mut scores: Vec<TopicScore> = TOPIC_KEYWORDS
        .iter()
        .filter_map(|(topic, keywords)| {
            let hits = keywords
                .iter()
                .filter(|k| tokens.iter().any(|t| t == *k) || contains_phrase(&lower, k))
                .count();
            if hits == 0 {
                return None;
            }
            let confidence = (0.5 + 0.2 * (hits as f64 - 1.0)).min(1.0);
            Some(TopicScore {
                topic: (*topic).to_string(),
                confidence,
            })
        })
        .collect();

    // Stable sort keeps taxonomy order on ties
    scores.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores
}

/// Topic names detected in text, best first.
pub fn extract_topics(text: &str) -> Vec<String> {
    classify(text).into_iter().map(|t| t.topic).collect()
}

/// All topic names in the taxonomy.
pub fn known_topics() -> impl Iterator<Item = &'static str> {
    TOPIC_KEYWORDS.iter().map(|(topic, _)| *topic)
}
