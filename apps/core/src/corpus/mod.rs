//! # Corpus
//!
//! Turns a source (intent records or an uploaded document) into ordered
//! text units.

pub mod document;
pub mod intents;

pub use document::{ngram_contexts, sentence_units, split_sentences, Document, TextUnit};
pub use intents::{Intent, IntentSet, PatternUnit};
