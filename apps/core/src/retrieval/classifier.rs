//! Classification matcher: one-vs-rest logistic regression over TF-IDF.
//!
//! Each class gets a binary model minimizing
//! `0.5 * ||w||^2 + C * sum(log(1 + exp(-y * (w.x + b))))`, with the
//! intercept left unregularized. Training is full-batch gradient descent
//! from zero weights, so a fit is fully deterministic for a given corpus.

use crate::corpus::{IntentSet, TextUnit};
use crate::error::AppError;
use crate::featurize::{SparseVector, TfidfVectorizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Training hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this.
    pub tolerance: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BinaryModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl BinaryModel {
    fn decision(&self, x: &SparseVector) -> f64 {
        x.dot_dense(&self.weights) + self.intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fits one binary model where `positive[i]` marks the positive samples.
fn fit_binary(
    samples: &[SparseVector],
    positive: &[bool],
    features: usize,
    options: &TrainingOptions,
) -> BinaryModel {
    let n = samples.len() as f64;
    let step = 1.0 / (1.0 + options.c * n / 4.0);
    let mut weights = vec![0.0f64; features];
    let mut intercept = 0.0f64;
    let mut grad_w = vec![0.0f64; features];

    for iteration in 0..options.max_iter {
        grad_w.copy_from_slice(&weights);
        let mut grad_b = 0.0;

        for (x, &is_positive) in samples.iter().zip(positive) {
            let y = if is_positive { 1.0 } else { -1.0 };
            let z = x.dot_dense(&weights) + intercept;
            // d/dz log(1 + exp(-y z)) = -y * sigmoid(-y z)
            let coefficient = -y * sigmoid(-y * z) * options.c;
            for (col, value) in x.entries() {
                grad_w[*col] += coefficient * f64::from(*value);
            }
            grad_b += coefficient;
        }

        let grad_norm = (grad_w.iter().map(|g| g * g).sum::<f64>() + grad_b * grad_b).sqrt();
        if grad_norm < options.tolerance {
            debug!("Binary model converged after {} iterations", iteration);
            break;
        }

        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= step * g;
        }
        intercept -= step * grad_b;
    }

    BinaryModel { weights, intercept }
}

/// One-vs-rest logistic regression over string labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Sorted distinct labels; class `i` is `labels[i]`.
    labels: Vec<String>,
    models: Vec<BinaryModel>,
}

impl LogisticRegression {
    /// Trains on `(sample, label)` pairs. A single distinct label yields a
    /// model that always predicts it.
    pub fn fit(
        samples: &[SparseVector],
        labels: &[String],
        features: usize,
        options: &TrainingOptions,
    ) -> Result<Self, AppError> {
        if samples.len() != labels.len() {
            return Err(AppError::Index(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        if samples.is_empty() {
            return Err(AppError::Index("Cannot train on an empty corpus".to_string()));
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let models = if classes.len() == 1 {
            Vec::new()
        } else {
            classes
                .iter()
                .map(|class| {
                    let positive: Vec<bool> = labels.iter().map(|l| l == class).collect();
                    fit_binary(samples, &positive, features, options)
                })
                .collect()
        };

        info!(
            "Trained logistic regression: {} classes, {} samples, {} features",
            classes.len(),
            samples.len(),
            features
        );
        Ok(Self {
            labels: classes,
            models,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.labels
    }

    /// Decision value of every class for `x`.
    pub fn decision_function(&self, x: &SparseVector) -> Vec<f64> {
        if self.models.is_empty() {
            return vec![0.0; self.labels.len()];
        }
        self.models.iter().map(|m| m.decision(x)).collect()
    }

    /// Most likely label; ties go to the first class in sorted order.
    pub fn predict(&self, x: &SparseVector) -> Option<&str> {
        let scores = self.decision_function(x);
        let mut best: Option<(usize, f64)> = None;
        for (i, score) in scores.into_iter().enumerate() {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, _)| self.labels[i].as_str())
    }
}

/// Intent classifier: predicts a tag from (pattern, tag) training pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassifierMatcher {
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
}

impl IntentClassifierMatcher {
    pub fn train(intents: &IntentSet, options: &TrainingOptions) -> Result<Self, AppError> {
        let units = intents.pattern_units();
        let patterns: Vec<&str> = units.iter().map(|u| u.pattern).collect();
        let tags: Vec<String> = units.iter().map(|u| u.tag.to_string()).collect();

        let (vectorizer, rows) = TfidfVectorizer::fit_transform(&patterns);
        let model = LogisticRegression::fit(&rows, &tags, vectorizer.vocabulary_size(), options)?;
        Ok(Self { vectorizer, model })
    }

    /// Predicted tag for `query`.
    pub fn predict(&self, query: &str) -> Option<&str> {
        let x = self.vectorizer.transform(query);
        self.model.predict(&x)
    }
}

/// Sentence-index classifier over a document: every sentence is its own
/// class, so the model has as many classes as training samples. This
/// overfits by construction and is kept only as the document variant that
/// existed, not as a recommended strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceClassifierIndex {
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
    sentences: Vec<TextUnit>,
}

impl SentenceClassifierIndex {
    pub fn build(sentences: &[String], options: &TrainingOptions) -> Result<Self, AppError> {
        let units = crate::corpus::sentence_units(sentences);
        let labels: Vec<String> = (0..sentences.len()).map(|i| i.to_string()).collect();
        let (vectorizer, rows) = TfidfVectorizer::fit_transform(sentences);
        let model =
            LogisticRegression::fit(&rows, &labels, vectorizer.vocabulary_size(), options)?;
        Ok(Self {
            vectorizer,
            model,
            sentences: units,
        })
    }

    pub fn units(&self) -> &[TextUnit] {
        &self.sentences
    }

    /// Sentence whose index the model predicts.
    pub fn best_match(&self, query: &str) -> Option<&TextUnit> {
        let x = self.vectorizer.transform(query);
        let label = self.model.predict(&x)?;
        let index: usize = label.parse().ok()?;
        self.sentences.get(index)
    }
}
