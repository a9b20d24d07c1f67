//! TF-IDF vectorizer.
//!
//! Fit once over all text units, then project both the units and every
//! later query through the same vocabulary and idf weights. Rows are L2
//! normalized so cosine similarity reduces to a dot product.

use crate::nlp::tokenize::vectorizer_tokens;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Sparse row: `(column, weight)` pairs sorted by column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    pub fn new(mut entries: Vec<(usize, f32)>) -> Self {
        entries.sort_by_key(|(col, _)| *col);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    /// No non-zero weight at all (empty or fully out-of-vocabulary text).
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|(_, w)| *w == 0.0)
    }

    pub fn norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ci, wi) = self.entries[i];
            let (cj, wj) = other.entries[j];
            match ci.cmp(&cj) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wi * wj;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Dot product against a dense weight row.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|(col, w)| dense.get(*col).map(|d| d * f64::from(*w)))
            .sum()
    }
}

/// Cosine similarity of two sparse rows; zero when either is all zeros.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f32 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    a.dot(b) / (norm_a * norm_b)
}

/// Fitted vocabulary and smoothed idf weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learns the vocabulary (columns in sorted term order) and
    /// `idf = ln((1 + n) / (1 + df)) + 1`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|d| vectorizer_tokens(d.as_ref()))
            .collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let distinct: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in distinct {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f32;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (column, (term, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), column);
            idf.push(((1.0 + n) / (1.0 + df as f32)).ln() + 1.0);
        }

        debug!(
            "Fitted TF-IDF vocabulary: {} terms over {} documents",
            idf.len(),
            documents.len()
        );
        Self { vocabulary, idf }
    }

    /// Fits and transforms the same documents.
    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVector>) {
        let vectorizer = Self::fit(documents);
        let rows = documents
            .iter()
            .map(|d| vectorizer.transform(d.as_ref()))
            .collect();
        (vectorizer, rows)
    }

    /// Projects `text` into the fitted space. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for token in vectorizer_tokens(text) {
            if let Some(&column) = self.vocabulary.get(&token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.idf[column]))
            .collect();

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        SparseVector::new(entries)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf_of(&self, term: &str) -> Option<f32> {
        self.column_of(term).map(|c| self.idf[c])
    }
}
