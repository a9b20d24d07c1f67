use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
///
/// Nothing in here ever reaches a chat user: the `Responder` boundary turns
/// every variant into one of the fixed fallback replies.
#[derive(Debug, Error)]
pub enum AppError {
    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents malformed JSON in an intents file or notebook.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Represents a document whose text could not be extracted.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Represents failures of the sentence-embedding model.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Represents an index that cannot answer (unfitted, inconsistent shapes).
    #[error("Index error: {0}")]
    Index(String),

    /// Represents failures reading or writing the persisted index.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Represents errors specific to the actor system, such as communication failures.
    #[error("Actor error: {0}")]
    Actor(#[from] crate::actors::messages::ActorError),

    /// Represents data validation errors (e.g., invalid input format).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., invalid environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Represents failures of the CSV chat log.
    #[error("History log error: {0}")]
    History(String),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Json(e) => AppError::Validation(format!("JSON error: {}", e)),
            AppError::Extraction(s) => AppError::Extraction(s.clone()),
            AppError::Embedding(s) => AppError::Embedding(s.clone()),
            AppError::Index(s) => AppError::Index(s.clone()),
            AppError::Persistence(s) => AppError::Persistence(s.clone()),
            AppError::Actor(e) => AppError::Actor(e.clone()),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
            AppError::History(s) => AppError::History(s.clone()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Persistence(format!("Index encoding error: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::History(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}

impl From<tempfile::PersistError> for AppError {
    fn from(err: tempfile::PersistError) -> Self {
        AppError::Persistence(format!("Atomic replace failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
