//! Line normalization shared by the classifier and the header extractor.
//!
//! Statement keywords are matched against a "line key": the line lowercased,
//! stripped of accents and of all whitespace. Text extraction splits and merges
//! words unpredictably ("Total dos lançamentos" vs "Totaldoslançamentos"), so
//! comparing keys sidesteps spacing and accent drift in one step.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Lowercase and strip diacritics, keeping whitespace
pub fn fold(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

/// Folded text with every whitespace character removed
pub fn line_key(line: &str) -> String {
    fold(line).chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whitespace-stripped, lowercased copy that keeps accents (header fallbacks
/// match accented and unaccented label spellings separately)
pub fn compact_lower(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_lowercase()
}

pub fn contains_any(key: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| key.contains(n))
}

/// Character (not byte) offset of `needle` in `haystack`
pub fn char_position(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte_idx| haystack[..byte_idx].chars().count())
}
