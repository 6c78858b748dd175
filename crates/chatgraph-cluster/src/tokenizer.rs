//! Message text normalization and term extraction.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Common English function words that never become graph terms.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "this",
    "that", "these", "those", "i", "you", "he", "she", "it", "we", "they", "what", "which",
    "who", "when", "where", "why", "how", "all", "each", "every", "both", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "as", "just", "if", "into", "through", "during", "before", "after",
    "above", "below", "up", "down", "out", "off", "over", "under", "again", "further", "then",
    "once", "here", "there", "about", "me", "my", "him", "her", "his", "them", "their",
];

/// Shortest token kept, in chars.
const MIN_TOKEN_CHARS: usize = 3;

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Returns true if `word` (already lower-cased) is a stopword.
pub fn is_stopword(word: &str) -> bool {
    stopwords().contains(word)
}

/// Split message text into normalized terms.
///
/// Lower-cases the text, turns every character that is neither a word
/// character (alphanumeric or `_`) nor whitespace into a space, splits on
/// whitespace, then drops tokens of two characters or fewer and stopwords.
///
/// Word characters are Unicode alphanumerics, not just ASCII ones, so
/// `"été"` stays one token instead of splitting at the accents.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    normalized
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS && !is_stopword(token))
        .map(str::to_string)
        .collect()
}
