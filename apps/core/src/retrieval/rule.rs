//! Rule matcher: lemmatized whole-word pattern search.
//!
//! Every pattern and the query are split into `\w+` tokens, lowercased and
//! lemmatized, then joined by single spaces. An intent matches when one of
//! its lemmatized patterns occurs in the lemmatized query between word
//! boundaries. Intents are tried in input order; the first hit wins.

use crate::corpus::IntentSet;
use crate::nlp::tokenize::word_tokens;
use crate::nlp::{DictionaryLemmatizer, Lemmatizer};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

struct CompiledPattern {
    intent_index: usize,
    lemmatized: String,
    regex: Regex,
}

/// Compiled once per intent set.
pub struct RuleMatcher {
    patterns: Vec<CompiledPattern>,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl RuleMatcher {
    pub fn new(intents: &IntentSet) -> Self {
        Self::with_lemmatizer(intents, Arc::new(DictionaryLemmatizer::new()))
    }

    pub fn with_lemmatizer(intents: &IntentSet, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        let mut patterns = Vec::new();
        for unit in intents.pattern_units() {
            let lemmatized = lemmatizer.lemmatize_tokens(&word_tokens(unit.pattern));
            if lemmatized.is_empty() {
                debug!("Skipping pattern without words: {:?}", unit.pattern);
                continue;
            }
            match Regex::new(&format!(r"\b{}\b", regex::escape(&lemmatized))) {
                Ok(regex) => patterns.push(CompiledPattern {
                    intent_index: unit.intent_index,
                    lemmatized,
                    regex,
                }),
                Err(e) => warn!("Failed to compile pattern {:?}: {}", unit.pattern, e),
            }
        }
        Self { patterns, lemmatizer }
    }

    /// Lemmatized form of `text` as the matcher sees it.
    pub fn normalize(&self, text: &str) -> String {
        self.lemmatizer.lemmatize_tokens(&word_tokens(text))
    }

    /// Index of the first intent whose pattern occurs in `query`.
    pub fn find(&self, query: &str) -> Option<usize> {
        let normalized = self.normalize(query);
        if normalized.is_empty() {
            return None;
        }
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(&normalized))
            .map(|p| {
                debug!("Rule match on pattern '{}'", p.lemmatized);
                p.intent_index
            })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Intent;

    fn intents() -> IntentSet {
        IntentSet::new(vec![
            Intent::new("greeting", ["hi", "hello"], ["Hello!", "Hi there!"]),
            Intent::new("budget", ["create a budget", "budgets"], ["Start with income."]),
            Intent::new("goodbye", ["bye", "see you"], ["Goodbye"]),
        ])
    }

    #[test]
    fn test_whole_word_match() {
        let matcher = RuleMatcher::new(&intents());
        assert_eq!(matcher.find("Hi there"), Some(0));
        assert_eq!(matcher.find("well, HELLO!"), Some(0));
        // "hi" inside "this" or "history" must not match.
        assert_eq!(matcher.find("this history"), None);
    }

    #[test]
    fn test_lemmatized_match() {
        let matcher = RuleMatcher::new(&intents());
        assert_eq!(matcher.find("How do I create a budget?"), Some(1));
        assert_eq!(matcher.find("tell me about budget"), Some(1));
        assert_eq!(matcher.find("Create a few budgets"), Some(1));
    }

    #[test]
    fn test_first_intent_in_input_order_wins() {
        let matcher = RuleMatcher::new(&intents());
        assert_eq!(matcher.find("bye, hi"), Some(0));
    }

    #[test]
    fn test_multi_word_pattern_needs_contiguity() {
        let matcher = RuleMatcher::new(&intents());
        assert_eq!(matcher.find("see you soon"), Some(2));
        assert_eq!(matcher.find("see what you did"), None);
    }

    #[test]
    fn test_no_match_and_empty_query() {
        let matcher = RuleMatcher::new(&intents());
        assert_eq!(matcher.find("quantum physics"), None);
        assert_eq!(matcher.find(""), None);
        assert_eq!(matcher.find("?!"), None);
    }

    #[test]
    fn test_punctuation_only_patterns_skipped() {
        let set = IntentSet::new(vec![Intent::new("odd", ["???"], ["?"])]);
        let matcher = RuleMatcher::new(&set);
        assert_eq!(matcher.pattern_count(), 0);
        assert_eq!(matcher.find("???"), None);
    }
}
