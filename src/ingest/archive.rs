//! Raw snapshot document history, keyed by snapshot timestamp.
//!
//! Documents are kept in one of two places:
//!
//! - **cached**: bounded, least recently stored or read is evicted first
//! - **pinned**: kept until unpinned, never evicted
//!
//! Pinning moves a cached document to the pinned set; unpinning moves it back.

use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Error type for archive operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    /// No document is archived for the timestamp.
    #[error("No archived snapshot for timestamp {0}")]
    NotArchived(i64),
    /// Stored bytes no longer match the digest recorded when they were archived.
    #[error("Archived snapshot {timestamp} is corrupt: expected digest {expected}, found {actual}")]
    DigestMismatch {
        /// Snapshot timestamp.
        timestamp: i64,
        /// Digest recorded on store.
        expected: String,
        /// Digest of the bytes read back.
        actual: String,
    },
}

/// Listing entry for one archived document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Snapshot timestamp, milliseconds since the epoch.
    pub timestamp: i64,
    /// Document size in bytes.
    pub size: usize,
    /// Hex SHA-256 of the document.
    pub digest: String,
    /// Whether the document is pinned.
    pub pinned: bool,
}

/// Storage for raw snapshot documents.
///
/// Implementations must list entries in ascending timestamp order.
pub trait SnapshotArchive: Send + Sync {
    /// Archive a document; does nothing if the timestamp is already cached or pinned.
    fn store(&self, timestamp: i64, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// Fetch a document, verifying its digest.
    fn get(&self, timestamp: i64) -> Result<Option<Arc<[u8]>>, ArchiveError>;

    /// Move a cached document to the pinned set. Pinning a pinned document is a no-op.
    fn pin(&self, timestamp: i64) -> Result<(), ArchiveError>;

    /// Move a pinned document back to the cache.
    fn unpin(&self, timestamp: i64) -> Result<(), ArchiveError>;

    /// Every archived document, sorted by timestamp.
    fn list(&self) -> Vec<ArchiveEntry>;
}

/// Hex SHA-256 of a document.
pub fn document_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
struct StoredDocument {
    bytes: Arc<[u8]>,
    digest: String,
}

impl StoredDocument {
    fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
            digest: document_digest(bytes),
        }
    }

    fn verified(&self, timestamp: i64) -> Result<Arc<[u8]>, ArchiveError> {
        let actual = document_digest(&self.bytes);
        if actual != self.digest {
            return Err(ArchiveError::DigestMismatch {
                timestamp,
                expected: self.digest.clone(),
                actual,
            });
        }
        Ok(Arc::clone(&self.bytes))
    }

    fn entry(&self, timestamp: i64, pinned: bool) -> ArchiveEntry {
        ArchiveEntry {
            timestamp,
            size: self.bytes.len(),
            digest: self.digest.clone(),
            pinned,
        }
    }
}

struct ArchiveState {
    cached: LruCache<i64, StoredDocument>,
    pinned: BTreeMap<i64, StoredDocument>,
}

/// Archive occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Cached documents.
    pub cached: usize,
    /// Pinned documents.
    pub pinned: usize,
    /// Maximum cached documents.
    pub capacity: usize,
}

/// In-memory [`SnapshotArchive`].
pub struct InMemorySnapshotArchive {
    state: RwLock<ArchiveState>,
}

impl InMemorySnapshotArchive {
    /// Create an archive caching up to `capacity` unpinned documents (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: RwLock::new(ArchiveState {
                cached: LruCache::new(capacity),
                pinned: BTreeMap::new(),
            }),
        }
    }

    /// Current occupancy.
    pub fn stats(&self) -> ArchiveStats {
        let state = self.state.read();
        ArchiveStats {
            cached: state.cached.len(),
            pinned: state.pinned.len(),
            capacity: state.cached.cap().get(),
        }
    }
}

impl SnapshotArchive for InMemorySnapshotArchive {
    fn store(&self, timestamp: i64, bytes: &[u8]) -> Result<(), ArchiveError> {
        let mut state = self.state.write();
        if state.pinned.contains_key(&timestamp) || state.cached.contains(&timestamp) {
            return Ok(());
        }
        if let Some((evicted, _)) = state.cached.push(timestamp, StoredDocument::new(bytes)) {
            debug!(timestamp = evicted, "Evicted archived snapshot");
        }
        Ok(())
    }

    fn get(&self, timestamp: i64) -> Result<Option<Arc<[u8]>>, ArchiveError> {
        let mut state = self.state.write();
        if let Some(document) = state.pinned.get(&timestamp) {
            return document.verified(timestamp).map(Some);
        }
        match state.cached.get(&timestamp) {
            Some(document) => document.verified(timestamp).map(Some),
            None => Ok(None),
        }
    }

    fn pin(&self, timestamp: i64) -> Result<(), ArchiveError> {
        let mut state = self.state.write();
        if state.pinned.contains_key(&timestamp) {
            return Ok(());
        }
        let document = state
            .cached
            .pop(&timestamp)
            .ok_or(ArchiveError::NotArchived(timestamp))?;
        state.pinned.insert(timestamp, document);
        Ok(())
    }

    fn unpin(&self, timestamp: i64) -> Result<(), ArchiveError> {
        let mut state = self.state.write();
        let document = state
            .pinned
            .remove(&timestamp)
            .ok_or(ArchiveError::NotArchived(timestamp))?;
        if let Some((evicted, _)) = state.cached.push(timestamp, document) {
            debug!(timestamp = evicted, "Evicted archived snapshot");
        }
        Ok(())
    }

    fn list(&self) -> Vec<ArchiveEntry> {
        let state = self.state.read();
        let mut entries: Vec<ArchiveEntry> = state
            .pinned
            .iter()
            .map(|(&timestamp, document)| document.entry(timestamp, true))
            .chain(
                state
                    .cached
                    .iter()
                    .map(|(&timestamp, document)| document.entry(timestamp, false)),
            )
            .collect();
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamps(archive: &InMemorySnapshotArchive) -> Vec<(i64, bool)> {
        archive
            .list()
            .into_iter()
            .map(|entry| (entry.timestamp, entry.pinned))
            .collect()
    }

    #[test]
    fn test_store_and_get() {
        let archive = InMemorySnapshotArchive::new(4);
        archive.store(100, b"<dsn/>").unwrap();
        assert_eq!(archive.get(100).unwrap().as_deref(), Some(&b"<dsn/>"[..]));
        assert_eq!(archive.get(200).unwrap(), None);
    }

    #[test]
    fn test_store_existing_timestamp_is_noop() {
        let archive = InMemorySnapshotArchive::new(4);
        archive.store(100, b"first").unwrap();
        archive.store(100, b"second").unwrap();
        assert_eq!(archive.get(100).unwrap().as_deref(), Some(&b"first"[..]));

        archive.pin(100).unwrap();
        archive.store(100, b"third").unwrap();
        assert_eq!(archive.get(100).unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(timestamps(&archive), vec![(100, true)]);
    }

    #[test]
    fn test_list_is_sorted_with_pinned_flag() {
        let archive = InMemorySnapshotArchive::new(4);
        for timestamp in [300, 100, 200] {
            archive.store(timestamp, b"<dsn/>").unwrap();
        }
        archive.pin(200).unwrap();
        assert_eq!(timestamps(&archive), vec![(100, false), (200, true), (300, false)]);

        let entry = &archive.list()[0];
        assert_eq!(entry.size, 6);
        assert_eq!(entry.digest, document_digest(b"<dsn/>"));
    }

    #[test]
    fn test_cache_evicts_but_pinned_survive() {
        let archive = InMemorySnapshotArchive::new(2);
        archive.store(1, b"a").unwrap();
        archive.pin(1).unwrap();
        for timestamp in 2..=5 {
            archive.store(timestamp, b"b").unwrap();
        }
        assert_eq!(timestamps(&archive), vec![(1, true), (4, false), (5, false)]);
        assert_eq!(
            archive.stats(),
            ArchiveStats {
                cached: 2,
                pinned: 1,
                capacity: 2,
            }
        );
    }

    #[test]
    fn test_pin_and_unpin() {
        let archive = InMemorySnapshotArchive::new(2);
        assert_eq!(archive.pin(7), Err(ArchiveError::NotArchived(7)));
        assert_eq!(archive.unpin(7), Err(ArchiveError::NotArchived(7)));

        archive.store(7, b"doc").unwrap();
        archive.pin(7).unwrap();
        archive.pin(7).unwrap();
        archive.unpin(7).unwrap();
        assert_eq!(timestamps(&archive), vec![(7, false)]);
        assert_eq!(archive.unpin(7), Err(ArchiveError::NotArchived(7)));
    }

    #[test]
    fn test_corrupt_document_is_detected() {
        let archive = InMemorySnapshotArchive::new(2);
        archive.store(9, b"<dsn/>").unwrap();
        {
            let mut state = archive.state.write();
            if let Some(document) = state.cached.get_mut(&9) {
                document.bytes = Arc::from(&b"<dsn>"[..]);
            }
        }
        assert!(matches!(
            archive.get(9),
            Err(ArchiveError::DigestMismatch { timestamp: 9, .. })
        ));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let archive = InMemorySnapshotArchive::new(0);
        archive.store(1, b"a").unwrap();
        archive.store(2, b"b").unwrap();
        assert_eq!(timestamps(&archive), vec![(2, false)]);
    }
}
