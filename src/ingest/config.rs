//! Ingestion configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default cap on a single document, in bytes.
pub const MAX_DOCUMENT_SIZE: usize = 15_360;

/// Default number of unpinned documents the archive keeps.
pub const DEFAULT_ARCHIVE_CAPACITY: usize = 64;

const MAX_DOCUMENT_SIZE_VAR: &str = "DSN_MAX_DOCUMENT_SIZE";
const ARCHIVE_CAPACITY_VAR: &str = "DSN_ARCHIVE_CAPACITY";

/// Limits applied by the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// A document of this many bytes or more is rejected (default: 15360).
    pub max_document_size: usize,
    /// Cached (unpinned) documents kept by the archive (default: 64).
    pub archive_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_document_size: MAX_DOCUMENT_SIZE,
            archive_capacity: DEFAULT_ARCHIVE_CAPACITY,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// - `DSN_MAX_DOCUMENT_SIZE`
    /// - `DSN_ARCHIVE_CAPACITY`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_document_size: positive(&lookup, MAX_DOCUMENT_SIZE_VAR)
                .unwrap_or(defaults.max_document_size),
            archive_capacity: positive(&lookup, ARCHIVE_CAPACITY_VAR)
                .unwrap_or(defaults.archive_capacity),
        }
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!(variable = key, value = %raw, "Ignoring invalid setting; using default");
            None
        }
    }
}
