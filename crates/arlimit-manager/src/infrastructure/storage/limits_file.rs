//! YAML limits file store.

use std::path::{Path, PathBuf};

use arlimit_core::{decode_limits, encode_limits, LimitsFile};
use tracing::debug;

use crate::application::ports::{LimitsStore, StoreError};

/// [`LimitsStore`] backed by a single YAML file, rewritten in full on save.
#[derive(Debug, Clone)]
pub struct YamlLimitsStore {
    path: PathBuf,
}

impl YamlLimitsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LimitsStore for YamlLimitsStore {
    fn load(&self) -> Result<LimitsFile, StoreError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|source| StoreError::from_io(&self.path, source))?;
        let file = decode_limits(&text).map_err(|source| StoreError::Codec {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            path = %self.path.display(),
            commands = file.document().custom_limits().len(),
            "loaded limits file"
        );
        Ok(file)
    }

    fn save(&self, file: &LimitsFile) -> Result<(), StoreError> {
        let content = encode_limits(file).map_err(|source| StoreError::Codec {
            path: self.path.clone(),
            source,
        })?;

        // Ensure directory exists before writing.
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::from_io(dir, source))?;
        }

        std::fs::write(&self.path, content)
            .map_err(|source| StoreError::from_io(&self.path, source))?;

        debug!(path = %self.path.display(), "wrote limits file");
        Ok(())
    }
}
