//! # Retrieval
//!
//! Matchers that map a query to exactly one intent or text unit, plus the
//! response selector and the per-document index.
//!
//! ## Components
//! - `rule`: lemmatized whole-word intent matching
//! - `classifier`: one-vs-rest logistic regression over TF-IDF
//! - `similarity`: cosine argmax over n-gram windows or embeddings
//! - `selector`: uniform choice among an intent's responses
//! - `index`: the document index behind each document strategy

pub mod classifier;
pub mod index;
pub mod rule;
pub mod selector;
pub mod similarity;

pub use classifier::{IntentClassifierMatcher, LogisticRegression, SentenceClassifierIndex, TrainingOptions};
pub use index::{DocumentIndex, DocumentStrategy, IndexOptions};
pub use rule::RuleMatcher;
pub use selector::ResponseSelector;
pub use similarity::{stable_argmax, EmbeddingIndex, NgramIndex};
