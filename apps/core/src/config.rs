//! Runtime configuration.
//!
//! Read from the process environment after loading an optional `.env`
//! file, then validated before anything is built from it.

use crate::corpus::document::{MAX_WINDOW, MIN_WINDOW};
use crate::error::AppError;
use crate::fs_manager::{PortablePathManager, DATA_DIR_ENV};
use crate::retrieval::{IndexOptions, TrainingOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// How the Home chatbot matches intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStrategy {
    /// Lemmatized whole-word pattern matching.
    Rule,
    /// TF-IDF + logistic regression over (pattern, tag) pairs.
    Classifier,
}

impl FromStr for IntentStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule" | "regex" => Ok(Self::Rule),
            "classifier" | "logreg" => Ok(Self::Classifier),
            other => Err(AppError::Config(format!("Unknown intent strategy: {}", other))),
        }
    }
}

impl fmt::Display for IntentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Classifier => write!(f, "classifier"),
        }
    }
}

pub use crate::retrieval::index::DocumentStrategy;

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_window_bounds"))]
pub struct AppConfig {
    /// Root of the data tree (indexes, model cache, logs).
    pub data_dir: PathBuf,
    /// JSON intents file.
    pub intents_path: PathBuf,
    /// Notebook to read intents from instead of `intents_path`.
    pub notebook_path: Option<PathBuf>,
    pub intent_strategy: IntentStrategy,
    pub document_strategy: DocumentStrategy,
    /// Smallest n-gram context window, in sentences.
    #[validate(range(min = 1, max = 6))]
    pub min_window: usize,
    /// Largest n-gram context window, in sentences.
    #[validate(range(min = 1, max = 6))]
    pub max_window: usize,
    #[validate(range(min = 1))]
    pub classifier_max_iter: usize,
    /// Inverse regularization strength.
    #[validate(range(exclusive_min = 0.0))]
    pub classifier_c: f64,
    /// Persist document indexes and reuse them while the document is unchanged.
    pub persist_index: bool,
    /// CSV chat log; `None` disables logging.
    pub chat_log_path: Option<PathBuf>,
    #[validate(range(min = 1))]
    pub embedding_cache_size: usize,
    /// Seed for response selection; random when absent.
    pub seed: Option<u64>,
}

fn validate_window_bounds(config: &AppConfig) -> Result<(), ValidationError> {
    if config.min_window > config.max_window {
        return Err(ValidationError::new("min_window_exceeds_max_window"));
    }
    Ok(())
}

fn default_chat_log(data_dir: &Path) -> PathBuf {
    PortablePathManager::logs_dir_in(data_dir).join("chat_log.csv")
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = PortablePathManager::data_dir();
        Self {
            chat_log_path: Some(default_chat_log(&data_dir)),
            data_dir,
            intents_path: PathBuf::from("intents.json"),
            notebook_path: None,
            intent_strategy: IntentStrategy::Classifier,
            document_strategy: DocumentStrategy::Ngram,
            min_window: MIN_WINDOW,
            max_window: MAX_WINDOW,
            classifier_max_iter: 1000,
            classifier_c: 1.0,
            persist_index: false,
            embedding_cache_size: 1000,
            seed: None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, AppError>
where
    T::Err: fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AppError::Config(format!("{}: {}", name, e)))
        })
        .transpose()
}

impl AppConfig {
    /// Loads `.env` (if any), reads `NEBULA_*` variables over the defaults
    /// and validates the result.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Some(dir) = env_var(DATA_DIR_ENV) {
            config.set_data_dir(dir);
        }
        if let Some(path) = env_var("NEBULA_INTENTS_PATH") {
            config.intents_path = PathBuf::from(path);
        }
        if let Some(path) = env_var("NEBULA_NOTEBOOK_PATH") {
            config.notebook_path = Some(PathBuf::from(path));
        }
        if let Some(strategy) = parse_env::<IntentStrategy>("NEBULA_INTENT_STRATEGY")? {
            config.intent_strategy = strategy;
        }
        if let Some(strategy) = parse_env::<DocumentStrategy>("NEBULA_DOCUMENT_STRATEGY")? {
            config.document_strategy = strategy;
        }
        if let Some(n) = parse_env("NEBULA_MIN_WINDOW")? {
            config.min_window = n;
        }
        if let Some(n) = parse_env("NEBULA_MAX_WINDOW")? {
            config.max_window = n;
        }
        if let Some(n) = parse_env("NEBULA_CLASSIFIER_MAX_ITER")? {
            config.classifier_max_iter = n;
        }
        if let Some(c) = parse_env("NEBULA_CLASSIFIER_C")? {
            config.classifier_c = c;
        }
        if let Some(flag) = parse_env("NEBULA_PERSIST_INDEX")? {
            config.persist_index = flag;
        }
        if let Some(path) = env_var("NEBULA_CHAT_LOG") {
            config.chat_log_path = match path.as_str() {
                "off" | "none" => None,
                _ => Some(PathBuf::from(path)),
            };
        }
        if let Some(n) = parse_env("NEBULA_EMBEDDING_CACHE_SIZE")? {
            config.embedding_cache_size = n;
        }
        config.seed = parse_env("NEBULA_SEED")?;

        config.validate()?;
        Ok(config)
    }

    /// Moves the data tree. A chat log still at its default location
    /// under the old tree moves along; an explicit or disabled one stays.
    pub fn set_data_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if self.chat_log_path.as_deref() == Some(default_chat_log(&self.data_dir).as_path()) {
            self.chat_log_path = Some(default_chat_log(&dir));
        }
        self.data_dir = dir;
    }

    /// Directory holding persisted indexes.
    pub fn index_dir(&self) -> PathBuf {
        PortablePathManager::index_dir_in(&self.data_dir)
    }

    pub fn training_options(&self) -> TrainingOptions {
        TrainingOptions {
            c: self.classifier_c,
            max_iter: self.classifier_max_iter,
            ..TrainingOptions::default()
        }
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            min_window: self.min_window,
            max_window: self.max_window,
            training: self.training_options(),
        }
    }

    /// Directory holding the embedding model cache.
    pub fn embeddings_dir(&self) -> PathBuf {
        PortablePathManager::embeddings_dir_in(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "NEBULA_DATA_DIR",
        "NEBULA_INTENTS_PATH",
        "NEBULA_NOTEBOOK_PATH",
        "NEBULA_INTENT_STRATEGY",
        "NEBULA_DOCUMENT_STRATEGY",
        "NEBULA_MIN_WINDOW",
        "NEBULA_MAX_WINDOW",
        "NEBULA_CLASSIFIER_MAX_ITER",
        "NEBULA_CLASSIFIER_C",
        "NEBULA_PERSIST_INDEX",
        "NEBULA_CHAT_LOG",
        "NEBULA_EMBEDDING_CACHE_SIZE",
        "NEBULA_SEED",
    ];

    fn with_env<F: FnOnce()>(overrides: &[(&str, &str)], f: F) {
        let vars: Vec<(&str, Option<&str>)> = VARS
            .iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| *v);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_window, 1);
        assert_eq!(config.max_window, 6);
    }

    #[test]
    fn test_from_env_overrides() {
        with_env(
            &[
                ("NEBULA_DATA_DIR", "/tmp/nebula"),
                ("NEBULA_INTENT_STRATEGY", "rule"),
                ("NEBULA_DOCUMENT_STRATEGY", "embedding"),
                ("NEBULA_MAX_WINDOW", "3"),
                ("NEBULA_PERSIST_INDEX", "true"),
                ("NEBULA_CHAT_LOG", "off"),
                ("NEBULA_SEED", "42"),
            ],
            || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.data_dir, PathBuf::from("/tmp/nebula"));
                assert_eq!(config.intent_strategy, IntentStrategy::Rule);
                assert_eq!(config.document_strategy, DocumentStrategy::Embedding);
                assert_eq!(config.max_window, 3);
                assert!(config.persist_index);
                assert!(config.chat_log_path.is_none());
                assert_eq!(config.seed, Some(42));
            },
        );
    }

    #[test]
    fn test_set_data_dir_moves_default_chat_log() {
        let mut config = AppConfig::default();
        config.set_data_dir("/srv/nebula");
        assert_eq!(config.data_dir, PathBuf::from("/srv/nebula"));
        assert_eq!(
            config.chat_log_path,
            Some(PortablePathManager::logs_dir_in(Path::new("/srv/nebula")).join("chat_log.csv"))
        );
        assert_eq!(config.index_dir(), PortablePathManager::index_dir_in(Path::new("/srv/nebula")));
    }

    #[test]
    fn test_set_data_dir_keeps_explicit_chat_log() {
        with_env(&[("NEBULA_CHAT_LOG", "/var/log/nebula.csv")], || {
            let mut config = AppConfig::from_env().unwrap();
            config.set_data_dir("/srv/nebula");
            assert_eq!(config.chat_log_path, Some(PathBuf::from("/var/log/nebula.csv")));
        });

        with_env(&[("NEBULA_CHAT_LOG", "off")], || {
            let mut config = AppConfig::from_env().unwrap();
            config.set_data_dir("/srv/nebula");
            assert!(config.chat_log_path.is_none());
        });
    }

    #[test]
    fn test_window_out_of_range_rejected() {
        with_env(&[("NEBULA_MAX_WINDOW", "7")], || {
            assert!(matches!(AppConfig::from_env(), Err(AppError::Validation(_))));
        });
    }

    #[test]
    fn test_min_window_above_max_rejected() {
        with_env(&[("NEBULA_MIN_WINDOW", "4"), ("NEBULA_MAX_WINDOW", "2")], || {
            assert!(matches!(AppConfig::from_env(), Err(AppError::Validation(_))));
        });
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        with_env(&[("NEBULA_INTENT_STRATEGY", "telepathy")], || {
            assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
        });
    }

    #[test]
    fn test_unparsable_number_rejected() {
        with_env(&[("NEBULA_CLASSIFIER_MAX_ITER", "many")], || {
            assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
        });
    }
}
