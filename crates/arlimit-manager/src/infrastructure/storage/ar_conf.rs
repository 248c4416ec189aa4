//! `ar.conf` command declaration reader.

use std::path::{Path, PathBuf};

use arlimit_core::CommandSet;
use tracing::debug;

use crate::application::ports::{CommandSource, StoreError};

/// [`CommandSource`] that scans an `ar.conf` file on every read.
#[derive(Debug, Clone)]
pub struct ArConfCommandSource {
    path: PathBuf,
}

impl ArConfCommandSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandSource for ArConfCommandSource {
    fn read_commands(&self) -> Result<CommandSet, StoreError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|source| StoreError::from_io(&self.path, source))?;
        let commands = CommandSet::parse(&text);
        debug!(path = %self.path.display(), count = commands.len(), "read command declarations");
        Ok(commands)
    }
}
