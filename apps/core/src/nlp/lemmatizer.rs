//! Dictionary-style lemmatization.
//!
//! Mirrors WordNet's default (noun) morphology: an exception table is
//! consulted first, then the noun detachment rules. With a lexicon loaded a
//! rule result is only accepted when the lexicon knows it; without one the
//! rules are guarded against the usual false positives ("this", "bus",
//! "glass", short function words).

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Reduces a single lowercase word to its base form.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, word: &str) -> String;

    /// Lemmatizes every token and joins them with single spaces.
    fn lemmatize_tokens(&self, tokens: &[String]) -> String {
        tokens
            .iter()
            .map(|t| self.lemmatize(t))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

static NOUN_EXCEPTIONS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("children", "child"),
        ("men", "man"),
        ("women", "woman"),
        ("people", "person"),
        ("mice", "mouse"),
        ("geese", "goose"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("lives", "life"),
        ("wives", "wife"),
        ("knives", "knife"),
        ("leaves", "leaf"),
        ("halves", "half"),
        ("selves", "self"),
        ("wolves", "wolf"),
        ("analyses", "analysis"),
        ("crises", "crisis"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("data", "datum"),
        ("oxen", "ox"),
        ("dice", "die"),
    ]
    .into_iter()
    .collect()
});

/// Words the unguarded rules would damage.
static INVARIANT: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "news", "series", "species", "always", "perhaps", "sometimes", "thanks", "yes", "its",
        "his", "hers", "ours", "yours", "theirs", "whereas", "besides", "towards", "afterwards",
        "does", "goes", "was", "has", "is", "us", "as", "this", "thus", "plus", "less", "unless",
        "across", "lens", "mathematics", "physics", "economics", "politics", "chaos", "bias",
        "canvas", "atlas", "alias", "status", "campus", "virus", "bonus", "focus", "christmas",
    ]
    .into_iter()
    .collect()
});

/// Noun detachment rules, tried in order.
const NOUN_RULES: &[(&str, &str)] = &[
    ("ses", "s"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
    ("s", ""),
];

/// Exception table plus suffix rules, optionally validated by a lexicon.
#[derive(Debug, Default, Clone)]
pub struct DictionaryLemmatizer {
    lexicon: Option<HashSet<String>>,
}

impl DictionaryLemmatizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept rule outputs found in `words`.
    pub fn with_lexicon<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lexicon: Some(words.into_iter().map(Into::into).collect()),
        }
    }

    fn accepts(&self, candidate: &str, original: &str) -> bool {
        match &self.lexicon {
            Some(lexicon) => lexicon.contains(candidate),
            None => {
                candidate.chars().count() >= 2
                    && original.chars().count() > 3
                    && !original.ends_with("ss")
                    && !original.ends_with("us")
                    && !original.ends_with("is")
                    && !original.ends_with("ous")
            }
        }
    }
}

impl Lemmatizer for DictionaryLemmatizer {
    fn lemmatize(&self, word: &str) -> String {
        if let Some(base) = NOUN_EXCEPTIONS.get(word) {
            return (*base).to_string();
        }
        if let Some(lexicon) = &self.lexicon {
            if lexicon.contains(word) {
                return word.to_string();
            }
        } else if INVARIANT.contains(word) {
            return word.to_string();
        }

        for (suffix, replacement) in NOUN_RULES {
            if let Some(stem) = word.strip_suffix(suffix) {
                let candidate = format!("{}{}", stem, replacement);
                if self.accepts(&candidate, word) {
                    return candidate;
                }
            }
        }
        word.to_string()
    }
}
