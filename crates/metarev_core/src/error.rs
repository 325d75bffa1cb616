//! Error types for metarev core.
//!
//! Only persistence failures are hard errors. Unknown entities, unknown
//! revisions and unversioned keys degrade to empty results or no-ops and
//! never surface here.

use crate::restore::RestoreReport;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in metarev core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] metarev_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] metarev_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The journal holds a record that cannot be trusted.
    #[error("journal corruption at offset {offset}: {message}")]
    JournalCorruption {
        /// Offset of the offending record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Another process owns the journal file.
    #[error("journal locked: {path} is in use by another process")]
    JournalLocked {
        /// Path of the journal file.
        path: String,
    },

    /// The configuration was rejected at startup.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Why the configuration is invalid.
        message: String,
    },

    /// A restore finished every key but could not write some of them.
    #[error(
        "restore of {revision} incomplete: keys {failed:?} could not be written",
        revision = .report.revision,
        failed = .report.failed
    )]
    RestoreIncomplete {
        /// What was restored, cleared and failed.
        report: RestoreReport,
        /// The first store failure encountered.
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates a journal corruption error.
    pub fn journal_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true for failures of the backing store.
    ///
    /// These are the errors a host may retry. The core itself never does.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::RestoreIncomplete { .. }
        )
    }
}
