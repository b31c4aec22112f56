//! Ingestion boundary around the parsers.
//!
//! The parsers work on complete in-memory documents. This module bounds how those
//! documents are read, keeps a history of the raw bytes, and decides which parsed
//! snapshot is the current one.
//!
//! ```text
//! reader → read_bounded → parse_snapshot → SnapshotArchive::store → publish
//!                                 ↓ (on failure)
//!                         previous snapshot stays current
//! ```

pub mod archive;
pub mod bounded;
pub mod config;
pub mod monitor;

pub use archive::{
    document_digest, ArchiveEntry, ArchiveError, ArchiveStats, InMemorySnapshotArchive,
    SnapshotArchive,
};
pub use bounded::{check_size, read_bounded};
pub use config::{IngestConfig, DEFAULT_ARCHIVE_CAPACITY, MAX_DOCUMENT_SIZE};
pub use monitor::{IngestOutcome, SnapshotMonitor};

use crate::canonical::CanonicalError;
use crate::parser::ParseError;

/// Error type for ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Reading the document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The document reached the size cap.
    #[error("Document reached the {limit} byte limit")]
    TooLarge {
        /// Cap in bytes.
        limit: usize,
    },
    /// The document did not parse.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// The archive rejected the operation.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
    /// The parsed snapshot could not be fingerprinted.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

impl IngestError {
    /// Whether a stored document failed its digest check.
    pub fn is_digest_mismatch(&self) -> bool {
        matches!(self, Self::Archive(ArchiveError::DigestMismatch { .. }))
    }
}
