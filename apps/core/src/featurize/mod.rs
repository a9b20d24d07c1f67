//! # Featurizers
//!
//! Lexical (TF-IDF) and semantic (sentence embedding) projections of text
//! units. A fitted featurizer is always kept next to the vectors it produced.

pub mod embedding;
pub mod tfidf;

pub use embedding::{FastEmbedder, SentenceEmbedder};
pub use tfidf::{SparseVector, TfidfVectorizer};
