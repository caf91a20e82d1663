//! Small text helpers shared by the scorer, compressor and analyzers.

/// Lowercased word tokens; apostrophes are kept so "don't" stays one word.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Number of word tokens.
pub fn word_count(text: &str) -> usize {
    tokenize(text).len()
}

/// Whether `phrase` occurs in `lower_text` on word boundaries.
///
/// `lower_text` must already be lowercased.
pub fn contains_phrase(lower_text: &str, phrase: &str) -> bool {
    let bytes = lower_text.as_bytes();
    lower_text.match_indices(phrase).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        before_ok && after_ok
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'\''
}

/// Split text into trimmed, non-empty sentences.
pub fn sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Truncate to at most `max_chars` characters, appending "..." when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
