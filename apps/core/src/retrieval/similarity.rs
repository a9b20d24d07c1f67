//! Similarity matchers: cosine argmax over indexed vectors.

use crate::corpus::{ngram_contexts, sentence_units, TextUnit};
use crate::error::AppError;
use crate::featurize::embedding::{self, SentenceEmbedder};
use crate::featurize::tfidf::{self, SparseVector, TfidfVectorizer};
use crate::nlp::tokenize::word_set;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Index of the largest score; the first one wins on ties. `None` only
/// for an empty slice. NaN scores never win.
pub fn stable_argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some((i, score)),
            Some((_, best_score)) if score > best_score || (best_score.is_nan() && !score.is_nan()) => {
                best = Some((i, score))
            }
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// What the n-gram matcher found.
#[derive(Debug, Clone, PartialEq)]
pub enum NgramAnswer<'a> {
    /// The sentence of the best window sharing the most words with the query.
    Overlap(&'a str),
    /// No sentence shares a word; the window's first sentence.
    FirstSentence(&'a str),
    /// The best window has no sentences to offer.
    NotFound,
}

/// TF-IDF over every 1..=6 sentence window of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramIndex {
    vectorizer: TfidfVectorizer,
    rows: Vec<SparseVector>,
    contexts: Vec<TextUnit>,
    sentences: Vec<String>,
}

impl NgramIndex {
    pub fn build(sentences: &[String], min_window: usize, max_window: usize) -> Self {
        let contexts = ngram_contexts(sentences, min_window, max_window);
        let texts: Vec<&str> = contexts.iter().map(|c| c.text.as_str()).collect();
        let (vectorizer, rows) = TfidfVectorizer::fit_transform(&texts);
        debug!(
            "Built n-gram index: {} sentences, {} windows",
            sentences.len(),
            contexts.len()
        );
        Self {
            vectorizer,
            rows,
            contexts,
            sentences: sentences.to_vec(),
        }
    }

    pub fn contexts(&self) -> &[TextUnit] {
        &self.contexts
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    /// Window with the highest cosine similarity to `query`.
    pub fn best_context(&self, query: &str) -> Option<(usize, f32)> {
        let query_vec = self.vectorizer.transform(query);
        let scores: Vec<f32> = self
            .rows
            .iter()
            .map(|row| tfidf::cosine_similarity(&query_vec, row))
            .collect();
        stable_argmax(&scores).map(|i| (i, scores[i]))
    }

    /// Locates the best window, then the best-overlapping sentence inside it.
    pub fn answer(&self, query: &str) -> NgramAnswer<'_> {
        let Some((best, score)) = self.best_context(query) else {
            return NgramAnswer::NotFound;
        };
        let context = &self.contexts[best];
        debug!(
            "Best window {}..={} (similarity {:.3})",
            context.start, context.end, score
        );

        let Some(candidates) = self.sentences.get(context.start..=context.end) else {
            return NgramAnswer::NotFound;
        };

        let query_words = word_set(query);
        let mut best_sentence: Option<&str> = None;
        let mut max_overlap = 0;
        for sentence in candidates {
            let overlap = word_set(sentence).intersection(&query_words).count();
            if overlap > max_overlap {
                max_overlap = overlap;
                best_sentence = Some(sentence);
            }
        }

        match (best_sentence, candidates.first()) {
            (Some(sentence), _) => NgramAnswer::Overlap(sentence),
            (None, Some(first)) => NgramAnswer::FirstSentence(first),
            (None, None) => NgramAnswer::NotFound,
        }
    }
}

/// Sentence embeddings plus the id of the model that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingIndex {
    model_id: String,
    vectors: Vec<Vec<f32>>,
    sentences: Vec<TextUnit>,
}

impl EmbeddingIndex {
    pub fn build(sentences: &[String], embedder: &dyn SentenceEmbedder) -> Result<Self, AppError> {
        let vectors = embedder.embed(sentences)?;
        if vectors.len() != sentences.len() {
            return Err(AppError::Embedding(format!(
                "Model returned {} vectors for {} sentences",
                vectors.len(),
                sentences.len()
            )));
        }
        Ok(Self {
            model_id: embedder.model_id().to_string(),
            vectors,
            sentences: sentence_units(sentences),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn units(&self) -> &[TextUnit] {
        &self.sentences
    }

    /// Sentence with the highest cosine similarity to the query embedding.
    pub fn best_match(
        &self,
        query: &str,
        embedder: &dyn SentenceEmbedder,
    ) -> Result<Option<&TextUnit>, AppError> {
        if embedder.model_id() != self.model_id {
            return Err(AppError::Index(format!(
                "Index built with {} but queried with {}",
                self.model_id,
                embedder.model_id()
            )));
        }
        let query_vec = embedder.embed_query(query)?;
        let scores: Vec<f32> = self
            .vectors
            .iter()
            .map(|v| embedding::cosine_similarity(&query_vec, v))
            .collect();
        Ok(stable_argmax(&scores).and_then(|i| self.sentences.get(i)))
    }
}
