//! Dense sentence embeddings.
//!
//! The model is a black box: text in, fixed-length vector out,
//! deterministic for a given model version.

use crate::error::AppError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};

/// Maps sentences to fixed-length vectors.
pub trait SentenceEmbedder: Send + Sync {
    /// Stable identifier of the model, stored next to persisted vectors.
    fn model_id(&self) -> &str;

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;

    /// Embeds one query.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, AppError> {
        self.embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("No embedding generated".to_string()))
    }
}

/// Cosine similarity of two dense vectors; zero on length mismatch or a
/// zero-magnitude input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

const MODEL_ID: &str = "fastembed/AllMiniLML6V2";

/// FastEmbed AllMiniLML6V2 with an LRU cache for query embeddings.
pub struct FastEmbedder {
    model: TextEmbedding,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl FastEmbedder {
    /// Loads the model from (or downloads it into) `cache_dir`.
    pub fn new(cache_dir: PathBuf, cache_size: usize) -> Result<Self, AppError> {
        let mut options = InitOptions::new(EmbeddingModel::AllMiniLML6V2);
        options.show_download_progress = false;
        options.cache_dir = cache_dir;

        let model = TextEmbedding::try_new(options).map_err(|e| {
            error!("Failed to load embedding model: {}", e);
            AppError::Embedding(format!("Failed to load embedding model: {}", e))
        })?;
        info!("Embedding model loaded successfully");

        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            model,
            query_cache: Mutex::new(LruCache::new(capacity)),
        })
    }
}

impl SentenceEmbedder for FastEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| AppError::Embedding(format!("Embedding failed: {}", e)))
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>, AppError> {
        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(embedding) = cache.get(query) {
                info!("Cache hit for query: '{}'", query);
                return Ok(embedding.clone());
            }
        }

        let embedding = self
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("No embedding generated".to_string()))?;

        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(query.to_string(), embedding.clone());
        }
        Ok(embedding)
    }
}
