//! Fuzzy word matching
//!
//! Compares a spoken token against the expected word of a passage. Speech
//! recognizers rarely return children's reading verbatim, so near misses are
//! accepted with an edit-distance tolerance that grows with word length.

use strsim::levenshtein;

/// Tokens the recognizer emits for hesitations; never judged as reading attempts
pub const FILLER_WORDS: &[&str] = &["um", "uh", "ah", "hmm", "er", "like"];

/// Tokens of this many characters or fewer are never counted as mistakes
pub const MIN_MISTAKE_LEN: usize = 2;

/// Case-fold a token and keep only word characters (alphanumeric and `_`)
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a normalized token is a hesitation filler
pub fn is_filler(token: &str) -> bool {
    FILLER_WORDS.contains(&token)
}

/// Whether a failed match of this token should count as a reading mistake
pub fn counts_as_mistake(spoken: &str) -> bool {
    spoken.chars().count() > MIN_MISTAKE_LEN
}

/// Maximum accepted edit distance for an expected word
pub fn tolerance(expected: &str) -> usize {
    match expected.chars().count() {
        0..=4 => 1,
        5..=7 => 2,
        _ => 3,
    }
}

/// Whether `spoken` is close enough to `expected` to count as a correct read
///
/// Both inputs must already be normalized. Tokens shorter than two
/// characters only match exactly.
pub fn is_close_match(spoken: &str, expected: &str) -> bool {
    if spoken == expected {
        return true;
    }

    if spoken.chars().count() < 2 || expected.chars().count() < 2 {
        return false;
    }

    within_tolerance(spoken, expected, tolerance(expected))
}

/// Edit-distance acceptance at an explicit tolerance
pub fn within_tolerance(spoken: &str, expected: &str, tolerance: usize) -> bool {
    levenshtein(spoken, expected) <= tolerance
}
