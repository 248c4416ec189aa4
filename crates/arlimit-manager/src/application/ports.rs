//! Ports the manager depends on: where limits are stored and where commands
//! are declared.
//!
//! Production implementations live in `infrastructure::storage`; unit tests
//! use the `mockall`-generated `MockLimitsStore` / `MockCommandSource`.

use std::io;
use std::path::PathBuf;

use arlimit_core::{CodecError, CommandSet, LimitsFile};
use thiserror::Error;

/// Error type for reading or writing the backing files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file does not exist.
    #[error("{path} does not exist")]
    NotFound { path: PathBuf },

    /// The process may not read or write the file.
    #[error("permission denied accessing {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other file-system failure.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The limits file content could not be decoded or encoded.
    #[error("invalid limits file {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
}

impl StoreError {
    /// Classifies an I/O error by kind.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied { path, source },
            _ => StoreError::Io { path, source },
        }
    }
}

/// Persistent home of the limits file.
#[cfg_attr(test, mockall::automock)]
pub trait LimitsStore {
    /// Reads and decodes the whole limits file.
    fn load(&self) -> Result<LimitsFile, StoreError>;

    /// Encodes `file` and overwrites the stored copy in full.
    fn save(&self, file: &LimitsFile) -> Result<(), StoreError>;
}

/// Source of the active-response command declarations.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSource {
    /// Returns the commands currently declared.
    fn read_commands(&self) -> Result<CommandSet, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = StoreError::from_io("ar.conf", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_from_io_maps_permission_denied() {
        let err = StoreError::from_io(
            "ar_limit_conf.yaml",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
    }

    #[test]
    fn test_from_io_maps_other_kinds_to_io() {
        let err = StoreError::from_io("x", io::Error::from(io::ErrorKind::InvalidData));
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_not_found_message_names_the_path() {
        let err = StoreError::NotFound {
            path: PathBuf::from("/etc/ar.conf"),
        };
        assert_eq!(err.to_string(), "/etc/ar.conf does not exist");
    }
}
