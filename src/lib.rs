//! # dsn-state-kernel
//!
//! Exact parsing of Deep Space Network (DSN) topology and telemetry documents.
//!
//! Two XML documents describe the network:
//!
//! > **Topology**: which stations exist, which dishes each owns, which spacecraft exist.
//! >
//! > **Snapshot**: what every active dish is doing at one instant.
//!
//! ## Core Contract
//!
//! 1. Every numeric value is stored as a fixed-point integer; nothing is rounded
//! 2. A document either parses completely or is rejected with a [`ParseError`]
//! 3. After parsing, every dish a reporting station owns has an entry in the snapshot,
//!    [`DishEntry::NotReporting`] when the document was silent about it
//!
//! ## Architecture
//!
//! ```text
//! topology bytes → parse_topology → Topology ─┐
//!                                             ↓
//! snapshot bytes → parse_snapshot ────────→ Snapshot → Fingerprint
//!                        ↑
//!                    fixed_point::Field (decode table)
//! ```
//!
//! The [`ingest`] module wraps the parsers with a size-capped reader, a raw document
//! archive and a "latest good snapshot" monitor.
//!
//! ## Determinism Guarantees
//!
//! - Same bytes + same topology → equal models and equal fingerprints
//! - Dish and spacecraft maps are ordered by name; stations keep document order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod fixed_point;
pub mod ingest;
pub mod parser;
pub mod types;

// Re-exports
pub use canonical::{canonical_hash, to_canonical_bytes, CanonicalError, Fingerprint};
pub use fixed_point::{Field, NumericError, Width, ABSENT, NO_DATA_LITERAL};
pub use ingest::{
    read_bounded, ArchiveEntry, ArchiveError, InMemorySnapshotArchive, IngestConfig,
    IngestError, IngestOutcome, SnapshotArchive, SnapshotMonitor, MAX_DOCUMENT_SIZE,
};
pub use parser::{parse_snapshot, parse_topology, ErrorKind, ParseError};
pub use types::{
    Dish, DishEntry, DishState, Signal, SignalDirection, Snapshot, Spacecraft, Station,
    StationState, Target, Topology,
};
