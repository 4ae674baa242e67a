use serde::{Deserialize, Serialize};

/// One target word of a passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Word as printed, punctuation removed
    pub text: String,

    /// Whether the reader has attempted this word
    pub is_read: bool,

    /// Whether the attempt matched; only meaningful when `is_read`
    pub is_correct: bool,
}

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_read: false,
            is_correct: false,
        }
    }
}

fn is_joiner(c: char) -> bool {
    matches!(c, '\'' | '\u{2019}' | '-')
}

/// Strip punctuation from a printed word, keeping internal apostrophes and hyphens
fn clean_word(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == '_' || is_joiner(c))
        .collect();

    kept.trim_matches(is_joiner).to_string()
}

/// Split passage text into target words
pub fn tokenize_passage(text: &str) -> Vec<Word> {
    text.split_whitespace()
        .map(clean_word)
        .filter(|w| !w.is_empty())
        .map(Word::new)
        .collect()
}
