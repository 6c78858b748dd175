//! Locating a graph term inside message text.
//!
//! Lets a caller highlight every occurrence of a clicked node's term in the
//! messages listed on that node.

use std::ops::Range;

use regex::RegexBuilder;
use tracing::warn;

/// Byte ranges of case-insensitive, whole-word occurrences of `term` in `text`.
///
/// `term` is matched literally. An empty term matches nothing.
pub fn find_term_spans(text: &str, term: &str) -> Vec<Range<usize>> {
    if term.is_empty() {
        return Vec::new();
    }
    let pattern = format!(r"\b{}\b", regex::escape(term));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.find_iter(text).map(|m| m.range()).collect(),
        Err(e) => {
            warn!(term, error = %e, "Could not build highlight pattern");
            Vec::new()
        }
    }
}

/// Returns true if `text` contains `term` as a whole word.
pub fn contains_term(text: &str, term: &str) -> bool {
    !find_term_spans(text, term).is_empty()
}
