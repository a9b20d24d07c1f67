//! # NLP helpers
//!
//! Tokenizers and the lemmatizer shared by the featurizers and matchers.
//!
//! ## Components
//! - `tokenize`: vectorizer tokens, overlap word sequences, lemmatizer word tokens
//! - `lemmatizer`: dictionary-style lemmatization for the rule matcher

pub mod lemmatizer;
pub mod tokenize;

pub use lemmatizer::{DictionaryLemmatizer, Lemmatizer};
