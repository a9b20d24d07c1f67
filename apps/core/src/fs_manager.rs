use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "NEBULA_DATA_DIR";

pub struct PortablePathManager;

impl PortablePathManager {
    /// Application root: the directory holding the executable, or the
    /// current directory when that cannot be resolved.
    pub fn root_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(mut path) => {
                path.pop();
                path
            }
            Err(e) => {
                warn!(
                    "Failed to get current exe path: {}. Falling back to current_dir.",
                    e
                );
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
        }
    }

    /// Main data directory (`$NEBULA_DATA_DIR` or `./data` next to the executable).
    pub fn data_dir() -> PathBuf {
        match std::env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => Self::root_dir().join("data"),
        }
    }

    /// Persisted feature indexes (`<data>/index`).
    pub fn index_dir_in(data_dir: &Path) -> PathBuf {
        data_dir.join("index")
    }

    /// Embedding model cache (`<data>/models/embeddings`).
    pub fn embeddings_dir_in(data_dir: &Path) -> PathBuf {
        data_dir.join("models").join("embeddings")
    }

    /// Chat logs (`<data>/logs`).
    pub fn logs_dir_in(data_dir: &Path) -> PathBuf {
        data_dir.join("logs")
    }

    /// Creates the data tree under `data_dir` if missing.
    pub fn init(data_dir: &Path) -> Result<(), std::io::Error> {
        for dir in [
            data_dir.to_path_buf(),
            Self::index_dir_in(data_dir),
            Self::embeddings_dir_in(data_dir),
            Self::logs_dir_in(data_dir),
        ] {
            if !dir.exists() {
                info!("Creating directory: {:?}", dir);
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}
