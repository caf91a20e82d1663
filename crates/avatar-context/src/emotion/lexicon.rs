//! Keyword dictionaries for heuristic emotion detection.

use once_cell::sync::Lazy;

use crate::text::{contains_phrase, tokenize};
use crate::types::Emotion;

/// Keyword dictionaries used by the keyword scorer.
///
/// Categories are kept in a `Vec` so iteration order is stable; ties between
/// categories resolve to the one listed first.
#[derive(Debug, Clone)]
pub struct EmotionLexicon {
    pub categories: Vec<(Emotion, Vec<String>)>,
    /// Vocabulary that marks a strong emotional statement
    pub strong: Vec<String>,
    /// Vocabulary that marks a very strong emotional statement
    pub very_strong: Vec<String>,
    /// Fallback sentiment lexicon
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub intensifiers: Vec<String>,
    pub diminishers: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

static BUILTIN: Lazy<EmotionLexicon> = Lazy::new(|| EmotionLexicon {
    categories: vec![
        (
            Emotion::Happy,
            owned(&[
                "happy", "glad", "joy", "joyful", "pleased", "delighted", "cheerful", "smile",
                "smiling", "wonderful", "lovely", "love", "yay",
            ]),
        ),
        (
            Emotion::Sad,
            owned(&[
                "sad", "unhappy", "depressed", "miserable", "heartbroken", "lonely", "cry",
                "crying", "upset", "gloomy", "hopeless", "devastated", "feeling down",
            ]),
        ),
        (
            Emotion::Excited,
            owned(&[
                "excited", "thrilled", "ecstatic", "pumped", "stoked", "can't wait", "eager",
                "amazing", "awesome", "hyped", "fantastic", "incredible",
            ]),
        ),
        (
            Emotion::Calm,
            owned(&[
                "calm", "relaxed", "peaceful", "serene", "chill", "tranquil", "at ease", "mellow",
                "rested",
            ]),
        ),
        (
            Emotion::Frustrated,
            owned(&[
                "frustrated", "frustrating", "annoyed", "irritated", "fed up", "stuck", "ugh",
                "annoying", "tired of", "sick of", "doesn't work",
            ]),
        ),
        (
            Emotion::Confused,
            owned(&[
                "confused", "confusing", "don't understand", "unclear", "puzzled",
                "what do you mean", "makes no sense", "unsure", "baffled", "huh",
            ]),
        ),
        (
            Emotion::Curious,
            owned(&[
                "curious", "wonder", "wondering", "how does", "why does", "interested",
                "tell me", "what if", "fascinating", "intrigued",
            ]),
        ),
        (
            Emotion::Anxious,
            owned(&[
                "anxious", "worried", "nervous", "scared", "afraid", "stressed", "panic",
                "uneasy", "fear", "tense", "overwhelmed",
            ]),
        ),
        (
            Emotion::Angry,
            owned(&[
                "angry", "mad", "furious", "outraged", "hate", "rage", "livid", "pissed",
            ]),
        ),
        (
            Emotion::Grateful,
            owned(&[
                "grateful", "thank", "thanks", "thank you", "appreciate", "thankful",
                "appreciated",
            ]),
        ),
    ],
    strong: owned(&[
        "love", "hate", "thrilled", "ecstatic", "furious", "devastated", "terrified",
        "miserable", "heartbroken", "amazing", "awful", "terrible", "incredible", "fantastic",
    ]),
    very_strong: owned(&[
        "absolutely", "extremely", "incredibly", "completely", "totally", "utterly", "insanely",
    ]),
    positive: owned(&[
        "good", "great", "nice", "fine", "cool", "like", "yes", "sure", "best", "fun",
        "beautiful", "perfect", "enjoy", "well",
    ]),
    negative: owned(&[
        "bad", "no", "not", "wrong", "worse", "worst", "hard", "difficult", "boring",
        "problem", "fail", "broken", "poor", "awful", "terrible",
    ]),
    intensifiers: owned(&[
        "very", "really", "so", "extremely", "absolutely", "totally", "incredibly", "super",
        "truly", "completely",
    ]),
    diminishers: owned(&[
        "slightly", "somewhat", "a bit", "a little", "kind of", "sort of", "barely", "mildly",
        "fairly",
    ]),
});

impl EmotionLexicon {
    /// The built-in English dictionaries.
    pub fn builtin() -> &'static EmotionLexicon {
        &BUILTIN
    }

    /// Keywords registered for an emotion.
    pub fn keywords(&self, emotion: Emotion) -> &[String] {
        self.categories
            .iter()
            .find(|(e, _)| *e == emotion)
            .map(|(_, words)| words.as_slice())
            .unwrap_or(&[])
    }

    /// Count how many entries of `words` occur in the text.
    ///
    /// Single words are matched against tokens; phrases on word boundaries.
    pub fn count_matches(words: &[String], lower_text: &str, tokens: &[String]) -> usize {
        words
            .iter()
            .filter(|w| Self::matches(w, lower_text, tokens))
            .count()
    }

    /// Entries of `words` that occur in the text.
    pub fn matching<'a>(words: &'a [String], lower_text: &str, tokens: &[String]) -> Vec<&'a str> {
        words
            .iter()
            .filter(|w| Self::matches(w, lower_text, tokens))
            .map(String::as_str)
            .collect()
    }

    fn matches(word: &str, lower_text: &str, tokens: &[String]) -> bool {
        if word.contains(' ') {
            contains_phrase(lower_text, word)
        } else {
            tokens.iter().any(|t| t == word)
        }
    }

    /// Number of emotionally loaded words in the text: category keywords
    /// plus strong vocabulary plus sentiment words, each counted once.
    pub fn emotional_word_count(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        let tokens = tokenize(text);
        let mut seen: Vec<&str> = Vec::new();
        let lists = self
            .categories
            .iter()
            .map(|(_, words)| words)
            .chain([&self.strong, &self.positive, &self.negative]);
        for words in lists {
            for word in Self::matching(words, &lower, &tokens) {
                if !seen.contains(&word) {
                    seen.push(word);
                }
            }
        }
        seen.len()
    }
}

impl Default for EmotionLexicon {
    fn default() -> Self {
        BUILTIN.clone()
    }
}
