// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory content-addressed blob store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{blob_hash, BlobHash, BlobStore};

/// In-memory content-addressed blob store.
///
/// # Pinning Invariants
///
/// - `pin` on a missing blob is legal (records intent before the blob arrives).
/// - `put` of a pre-pinned hash preserves the pin.
#[derive(Debug, Default)]
pub struct MemoryTier {
    blobs: HashMap<BlobHash, Arc<[u8]>>,
    pins: HashSet<BlobHash>,
}

impl MemoryTier {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns `true` if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Returns `true` if the given hash is in the pin-set.
    pub fn is_pinned(&self, hash: &BlobHash) -> bool {
        self.pins.contains(hash)
    }
}

impl BlobStore for MemoryTier {
    fn put(&mut self, bytes: &[u8]) -> BlobHash {
        let hash = blob_hash(bytes);
        self.blobs.entry(hash).or_insert_with(|| Arc::from(bytes));
        hash
    }

    fn get(&self, hash: &BlobHash) -> Option<Arc<[u8]>> {
        self.blobs.get(hash).cloned()
    }

    fn pin(&mut self, hash: &BlobHash) {
        self.pins.insert(*hash);
    }

    fn unpin(&mut self, hash: &BlobHash) {
        self.pins.remove(hash);
    }
}
