//! Canonical serialization and fingerprints of parsed models.
//!
//! A fingerprint is the xxh64 of a model's canonical JSON bytes.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable map order: model maps are `BTreeMap`, or `IndexMap` in document order
//! - No floats: every numeric field is a fixed-point integer
//!
//! Two parses of the same bytes against the same topology have equal fingerprints, and
//! so do two snapshots that are equal as models.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Seed for every fingerprint.
const SEED: u64 = 0;

/// Error type for canonical serialization.
#[derive(Debug, thiserror::Error)]
#[error("Canonical serialization failed: {0}")]
pub struct CanonicalError(#[from] serde_json::Error);

/// Serialize a value to canonical JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(serde_json::to_vec(value)?)
}

/// Compute the canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, CanonicalError> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, SEED))
}

/// Content-derived identity of a parsed model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint of any serializable model.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, CanonicalError> {
        canonical_hash(value).map(Self)
    }

    /// Raw hash value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Sixteen lowercase hex digits.
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
