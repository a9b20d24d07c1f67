//! Tokenizers.
//!
//! Three separate token streams: the TF-IDF vocabulary drops
//! one-character tokens, the overlap re-rank keeps apostrophes and the rule
//! matcher needs every `\w` run.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

// NOTE: expect() on a literal pattern cannot fail at runtime.
static VECTORIZER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid regex: vectorizer token"));

static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("Invalid regex: word token"));

/// Characters replaced by spaces before splitting a word sequence.
const SEQUENCE_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Lowercased tokens of two or more word characters, in order.
pub fn vectorizer_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    VECTORIZER_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Lowercased word sequence with punctuation filtered out.
pub fn word_sequence(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if SEQUENCE_FILTERS.contains(c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Distinct words of `text` as used by the overlap re-rank.
pub fn word_set(text: &str) -> HashSet<String> {
    word_sequence(text).into_iter().collect()
}

/// Lowercased `\w+` runs, the unit the lemmatizer works on.
pub fn word_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectorizer_tokens_drop_single_chars() {
        assert_eq!(
            vectorizer_tokens("I have a Budget, OK?"),
            vec!["have", "budget", "ok"]
        );
    }

    #[test]
    fn test_word_sequence_filters_punctuation() {
        assert_eq!(
            word_sequence("Hello, World! It's (really) fine."),
            vec!["hello", "world", "it's", "really", "fine"]
        );
    }

    #[test]
    fn test_word_tokens_split_on_non_word() {
        assert_eq!(word_tokens("What's up, hi-five!"), vec!["what", "s", "up", "hi", "five"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(vectorizer_tokens("").is_empty());
        assert!(word_sequence("  ?! ").is_empty());
        assert!(word_tokens("...").is_empty());
    }
}
