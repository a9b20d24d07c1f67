//! Document feature index: one fitted matcher per uploaded document.

use super::classifier::{SentenceClassifierIndex, TrainingOptions};
use super::similarity::{EmbeddingIndex, NgramAnswer, NgramIndex};
use crate::corpus::TextUnit;
use crate::error::AppError;
use crate::featurize::SentenceEmbedder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// How an uploaded document is indexed and queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStrategy {
    /// TF-IDF over 1..=6 sentence windows with an overlap re-rank.
    Ngram,
    /// Logistic regression with one class per sentence.
    Classifier,
    /// Cosine similarity of sentence embeddings.
    Embedding,
}

impl FromStr for DocumentStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ngram" | "tfidf" => Ok(Self::Ngram),
            "classifier" | "logreg" => Ok(Self::Classifier),
            "embedding" | "semantic" => Ok(Self::Embedding),
            other => Err(AppError::Config(format!("Unknown document strategy: {}", other))),
        }
    }
}

impl fmt::Display for DocumentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ngram => write!(f, "ngram"),
            Self::Classifier => write!(f, "classifier"),
            Self::Embedding => write!(f, "embedding"),
        }
    }
}

/// Parameters needed to build any of the document indexes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexOptions {
    pub min_window: usize,
    pub max_window: usize,
    pub training: TrainingOptions,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            min_window: crate::corpus::document::MIN_WINDOW,
            max_window: crate::corpus::document::MAX_WINDOW,
            training: TrainingOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentIndex {
    Ngram(NgramIndex),
    Classifier(SentenceClassifierIndex),
    Embedding(EmbeddingIndex),
}

impl DocumentIndex {
    /// Fits the index for `strategy`. Only the embedding strategy needs an
    /// embedder; a missing one is an error there.
    pub fn build(
        strategy: DocumentStrategy,
        sentences: &[String],
        options: &IndexOptions,
        embedder: Option<&dyn SentenceEmbedder>,
    ) -> Result<Self, AppError> {
        info!(
            "Building {} index over {} sentences",
            strategy,
            sentences.len()
        );
        match strategy {
            DocumentStrategy::Ngram => Ok(Self::Ngram(NgramIndex::build(
                sentences,
                options.min_window,
                options.max_window,
            ))),
            DocumentStrategy::Classifier => Ok(Self::Classifier(SentenceClassifierIndex::build(
                sentences,
                &options.training,
            )?)),
            DocumentStrategy::Embedding => {
                let embedder = embedder.ok_or_else(|| {
                    AppError::Embedding("Embedding strategy requires an embedding model".to_string())
                })?;
                Ok(Self::Embedding(EmbeddingIndex::build(sentences, embedder)?))
            }
        }
    }

    pub fn strategy(&self) -> DocumentStrategy {
        match self {
            Self::Ngram(_) => DocumentStrategy::Ngram,
            Self::Classifier(_) => DocumentStrategy::Classifier,
            Self::Embedding(_) => DocumentStrategy::Embedding,
        }
    }

    /// Retrievable units: windows for n-grams, sentences otherwise.
    pub fn units(&self) -> Vec<TextUnit> {
        match self {
            Self::Ngram(index) => index.contexts().to_vec(),
            Self::Classifier(index) => index.units().to_vec(),
            Self::Embedding(index) => index.units().to_vec(),
        }
    }

    /// The extracted answer for `query`, or `None` when nothing can be
    /// retrieved.
    pub fn best_match(
        &self,
        query: &str,
        embedder: Option<&dyn SentenceEmbedder>,
    ) -> Result<Option<String>, AppError> {
        match self {
            Self::Ngram(index) => Ok(match index.answer(query) {
                NgramAnswer::Overlap(sentence) => Some(sentence.to_string()),
                NgramAnswer::FirstSentence(sentence) => {
                    warn!("No sentence overlaps the query; answering with window start");
                    Some(sentence.to_string())
                }
                NgramAnswer::NotFound => None,
            }),
            Self::Classifier(index) => Ok(index.best_match(query).map(|u| u.text.clone())),
            Self::Embedding(index) => {
                let embedder = embedder.ok_or_else(|| {
                    AppError::Embedding("Embedding index queried without a model".to_string())
                })?;
                Ok(index.best_match(query, embedder)?.map(|u| u.text.clone()))
            }
        }
    }
}
