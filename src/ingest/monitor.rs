//! Publication of the latest good snapshot.

use parking_lot::RwLock;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    check_size, read_bounded, InMemorySnapshotArchive, IngestConfig, IngestError,
    SnapshotArchive,
};
use crate::canonical::Fingerprint;
use crate::parser::parse_snapshot;
use crate::types::{Snapshot, Topology};

/// Result of a successful ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The snapshot differs from the previous one and is now current.
    Published {
        /// Snapshot timestamp.
        timestamp: i64,
        /// Fingerprint of the new snapshot.
        fingerprint: Fingerprint,
    },
    /// The snapshot is identical to the current one.
    Unchanged {
        /// Snapshot timestamp.
        timestamp: i64,
        /// Fingerprint shared with the current snapshot.
        fingerprint: Fingerprint,
    },
}

impl IngestOutcome {
    /// Fingerprint of the ingested snapshot.
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            Self::Published { fingerprint, .. } | Self::Unchanged { fingerprint, .. } => {
                *fingerprint
            }
        }
    }
}

struct Current {
    snapshot: Arc<Snapshot>,
    fingerprint: Fingerprint,
}

/// Holds a topology and the most recent snapshot that parsed against it.
///
/// A failed cycle never replaces the current snapshot.
pub struct SnapshotMonitor<A: SnapshotArchive = InMemorySnapshotArchive> {
    topology: Arc<Topology>,
    archive: A,
    config: IngestConfig,
    current: RwLock<Option<Current>>,
}

impl SnapshotMonitor<InMemorySnapshotArchive> {
    /// Create a monitor with an in-memory archive sized from `config`.
    pub fn in_memory(topology: Arc<Topology>, config: IngestConfig) -> Self {
        let archive = InMemorySnapshotArchive::new(config.archive_capacity);
        Self::new(topology, archive, config)
    }
}

impl<A: SnapshotArchive> SnapshotMonitor<A> {
    /// Create a monitor over an existing archive.
    pub fn new(topology: Arc<Topology>, archive: A, config: IngestConfig) -> Self {
        Self {
            topology,
            archive,
            config,
            current: RwLock::new(None),
        }
    }

    /// The topology snapshots are parsed against.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// The raw document archive.
    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Active limits.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// The current snapshot, if any cycle has succeeded.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .as_ref()
            .map(|current| Arc::clone(&current.snapshot))
    }

    /// Fingerprint of the current snapshot.
    pub fn latest_fingerprint(&self) -> Option<Fingerprint> {
        self.current.read().as_ref().map(|current| current.fingerprint)
    }

    /// Read a document from `reader` and ingest it.
    pub fn ingest_reader<R: Read>(&self, reader: R) -> Result<IngestOutcome, IngestError> {
        match read_bounded(reader, self.config.max_document_size) {
            Ok(bytes) => self.ingest_bytes(&bytes),
            Err(error) => Err(rejected(error)),
        }
    }

    /// Ingest a complete document.
    pub fn ingest_bytes(&self, bytes: &[u8]) -> Result<IngestOutcome, IngestError> {
        self.try_ingest(bytes).map_err(rejected)
    }

    fn try_ingest(&self, bytes: &[u8]) -> Result<IngestOutcome, IngestError> {
        check_size(bytes.len(), self.config.max_document_size)?;
        let snapshot = parse_snapshot(bytes, &self.topology)?;
        let fingerprint = Fingerprint::of(&snapshot)?;
        let timestamp = snapshot.timestamp();
        self.archive.store(timestamp, bytes)?;

        let mut current = self.current.write();
        if current.as_ref().map(|c| c.fingerprint) == Some(fingerprint) {
            debug!(timestamp, fingerprint = %fingerprint, "Snapshot unchanged");
            return Ok(IngestOutcome::Unchanged {
                timestamp,
                fingerprint,
            });
        }

        info!(
            timestamp,
            fingerprint = %fingerprint,
            stations = snapshot.station_states().len(),
            reporting_dishes = snapshot.reporting_dishes().count(),
            "Published snapshot"
        );
        *current = Some(Current {
            snapshot: Arc::new(snapshot),
            fingerprint,
        });
        Ok(IngestOutcome::Published {
            timestamp,
            fingerprint,
        })
    }

    /// Re-parse an archived document against the current topology.
    ///
    /// `None` when nothing is archived for `timestamp`.
    pub fn replay(&self, timestamp: i64) -> Result<Option<Snapshot>, IngestError> {
        let Some(bytes) = self.archive.get(timestamp)? else {
            return Ok(None);
        };
        Ok(Some(parse_snapshot(&bytes, &self.topology)?))
    }
}

fn rejected(error: IngestError) -> IngestError {
    warn!(error = %error, "Rejected snapshot document; keeping previous snapshot");
    error
}
