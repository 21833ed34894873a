// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content-addressed storage for reconstruction artifacts.
//!
//! `tracker-cas` has two layers:
//!
//! - [`BlobStore`]: opaque byte blobs keyed by their BLAKE3 hash, with a
//!   pin-set for retention roots. [`MemoryTier`] is the in-process store.
//! - [`ArtifactSink`]: the named-artifact port used by the composite
//!   assembler, `(folder, filename, bytes) -> StoredArtifact`. Adapters are
//!   [`CasArtifactSink`] (names over any `BlobStore`) and [`DirArtifactSink`]
//!   (plain files under a root directory).
//!
//! # Hash Domain Policy
//!
//! The artifact id is content-only: `BLAKE3(bytes)` with no domain prefix.
//! Two artifacts with identical bytes share an id regardless of their names.
#![forbid(unsafe_code)]

mod memory;
mod sink;

pub use memory::MemoryTier;
pub use sink::{ArtifactSink, CasArtifactSink, DirArtifactSink, SinkError, StoredArtifact};

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// A 32-byte BLAKE3 content hash.
///
/// Renders (and serializes) as lowercase hex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BlobHash(pub [u8; 32]);

impl BlobHash {
    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for BlobHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compute the BLAKE3 content hash of `bytes`.
pub fn blob_hash(bytes: &[u8]) -> BlobHash {
    BlobHash(*blake3::hash(bytes).as_bytes())
}

/// Content-addressed blob store.
///
/// # Absence Semantics
///
/// [`get`](BlobStore::get) returns `None` for blobs that were never stored;
/// that is not an error.
pub trait BlobStore {
    /// Compute hash and store. Returns the content hash.
    fn put(&mut self, bytes: &[u8]) -> BlobHash;

    /// Retrieve blob by hash.
    fn get(&self, hash: &BlobHash) -> Option<Arc<[u8]>>;

    /// Mark hash as a retention root. Legal on missing blobs.
    fn pin(&mut self, hash: &BlobHash);

    /// Remove retention root. No-op if not pinned.
    fn unpin(&mut self, hash: &BlobHash);
}
