//! On-disk document index.
//!
//! One bincode blob per strategy holding the fitted featurizer, vectors or
//! model, and the text units, stamped with the SHA-256 fingerprint of the
//! document it was built from. Writes go to a temp file in the same
//! directory and are renamed over the target, so a reader sees either the
//! old index or the new one.

use crate::corpus::TextUnit;
use crate::error::AppError;
use crate::retrieval::{DocumentIndex, DocumentStrategy, IndexOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const INDEX_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIndex {
    pub version: u32,
    /// Fingerprint of the source document.
    pub fingerprint: String,
    pub strategy: DocumentStrategy,
    /// Window bounds and training parameters the payload was built with.
    pub options: IndexOptions,
    /// Embedding model behind the vectors; `None` for lexical strategies.
    pub model_id: Option<String>,
    pub units: Vec<TextUnit>,
    pub payload: DocumentIndex,
}

impl PersistedIndex {
    pub fn new(
        fingerprint: &str,
        payload: DocumentIndex,
        options: IndexOptions,
        model_id: Option<&str>,
    ) -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            fingerprint: fingerprint.to_string(),
            strategy: payload.strategy(),
            options,
            model_id: model_id.map(str::to_string),
            units: payload.units(),
            payload,
        }
    }

    /// Same format, strategy, options and embedding model, whatever the
    /// document.
    pub fn is_built_with(
        &self,
        strategy: DocumentStrategy,
        options: &IndexOptions,
        model_id: Option<&str>,
    ) -> bool {
        self.version == INDEX_FORMAT_VERSION
            && self.strategy == strategy
            && self.options == *options
            && self.model_id.as_deref() == model_id
    }

    /// Built from this document with these parameters, in this format.
    pub fn is_fresh_for(
        &self,
        fingerprint: &str,
        strategy: DocumentStrategy,
        options: &IndexOptions,
        model_id: Option<&str>,
    ) -> bool {
        self.fingerprint == fingerprint && self.is_built_with(strategy, options, model_id)
    }
}

pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing `strategy`.
    pub fn path_for(&self, strategy: DocumentStrategy) -> PathBuf {
        self.dir.join(format!("{}_index.bin", strategy))
    }

    pub fn save(&self, index: &PersistedIndex) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(index.strategy);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut writer, index)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target)?;

        info!(
            "Saved {} index for {} to {:?}",
            index.strategy,
            short(&index.fingerprint),
            target
        );
        Ok(target)
    }

    /// The stored index for `strategy`, or `None` when there is no file.
    pub fn load(&self, strategy: DocumentStrategy) -> Result<Option<PersistedIndex>, AppError> {
        let path = self.path_for(strategy);
        if !path.exists() {
            debug!("No persisted index at {:?}", path);
            return Ok(None);
        }
        // Decoding from a slice bounds every length prefix by the file size.
        let bytes = fs::read(&path)?;
        let index: PersistedIndex = bincode::deserialize(&bytes)?;
        Ok(Some(index))
    }

    /// The stored index only if it was built from `fingerprint` with the
    /// same options and model. Stale, missing and unreadable files all come
    /// back as `None`.
    pub fn load_fresh(
        &self,
        fingerprint: &str,
        strategy: DocumentStrategy,
        options: &IndexOptions,
        model_id: Option<&str>,
    ) -> Option<PersistedIndex> {
        match self.load(strategy) {
            Ok(Some(index)) if index.is_fresh_for(fingerprint, strategy, options, model_id) => {
                info!("Reusing persisted {} index for {}", strategy, short(fingerprint));
                Some(index)
            }
            Ok(Some(index)) => {
                warn!(
                    "Persisted {} index is stale (built for {}, v{}, {:?}, model {:?}); rebuilding",
                    strategy,
                    short(&index.fingerprint),
                    index.version,
                    index.options,
                    index.model_id
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable {} index: {}", strategy, e);
                None
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
