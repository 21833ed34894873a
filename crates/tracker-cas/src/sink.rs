// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named-artifact sink port and its adapters.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{blob_hash, BlobHash, BlobStore};

/// Receipt for one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    /// BLAKE3 hash of the stored bytes.
    pub id: BlobHash,
    /// Destination folder, `/`-separated.
    pub folder: String,
    /// File name inside `folder`.
    pub filename: String,
    /// Number of bytes stored.
    pub byte_length: usize,
}

/// Errors raised by artifact sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Folder or file name is empty or escapes the destination.
    #[error("invalid artifact name {0:?}")]
    InvalidName(String),
    /// Filesystem write failed.
    #[error("failed to write artifact {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Destination for generated artifacts (mosaics, composite descriptors).
///
/// Storing under an existing `(folder, filename)` replaces the previous
/// artifact of that name.
pub trait ArtifactSink {
    /// Store `bytes` as `folder/filename`.
    fn store(&mut self, folder: &str, filename: &str, bytes: &[u8]) -> Result<StoredArtifact, SinkError>;
}

impl<T: ArtifactSink + ?Sized> ArtifactSink for &mut T {
    fn store(&mut self, folder: &str, filename: &str, bytes: &[u8]) -> Result<StoredArtifact, SinkError> {
        (**self).store(folder, filename, bytes)
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

fn check_names(folder: &str, filename: &str) -> Result<(), SinkError> {
    if !folder.split('/').all(valid_segment) {
        return Err(SinkError::InvalidName(folder.to_owned()));
    }
    if !valid_segment(filename) {
        return Err(SinkError::InvalidName(filename.to_owned()));
    }
    Ok(())
}

/// Sink that keeps a name manifest over a content-addressed [`BlobStore`].
///
/// Every named artifact is pinned in the store. Replacing a name unpins the
/// previous blob unless another name still refers to it.
#[derive(Debug, Default)]
pub struct CasArtifactSink<S> {
    blobs: S,
    manifest: BTreeMap<(String, String), StoredArtifact>,
}

impl<S: BlobStore> CasArtifactSink<S> {
    /// Wrap `blobs`.
    pub fn new(blobs: S) -> Self {
        Self {
            blobs,
            manifest: BTreeMap::new(),
        }
    }

    /// The underlying blob store.
    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    /// Look up an artifact's receipt by name.
    pub fn lookup(&self, folder: &str, filename: &str) -> Option<&StoredArtifact> {
        self.manifest.get(&(folder.to_owned(), filename.to_owned()))
    }

    /// Fetch an artifact's bytes by name.
    pub fn fetch(&self, folder: &str, filename: &str) -> Option<Arc<[u8]>> {
        self.lookup(folder, filename)
            .and_then(|artifact| self.blobs.get(&artifact.id))
    }

    /// Receipts in `folder`, sorted by filename.
    pub fn list(&self, folder: &str) -> Vec<&StoredArtifact> {
        self.manifest
            .values()
            .filter(|artifact| artifact.folder == folder)
            .collect()
    }
}

impl<S: BlobStore> ArtifactSink for CasArtifactSink<S> {
    fn store(&mut self, folder: &str, filename: &str, bytes: &[u8]) -> Result<StoredArtifact, SinkError> {
        check_names(folder, filename)?;
        let id = self.blobs.put(bytes);
        self.blobs.pin(&id);
        let artifact = StoredArtifact {
            id,
            folder: folder.to_owned(),
            filename: filename.to_owned(),
            byte_length: bytes.len(),
        };
        let key = (artifact.folder.clone(), artifact.filename.clone());
        if let Some(previous) = self.manifest.insert(key, artifact.clone()) {
            if previous.id != id && !self.manifest.values().any(|a| a.id == previous.id) {
                self.blobs.unpin(&previous.id);
            }
        }
        debug!(%id, folder, filename, bytes = bytes.len(), "stored artifact blob");
        Ok(artifact)
    }
}

/// Sink writing plain files under `root/<folder>/<filename>`.
#[derive(Debug, Clone)]
pub struct DirArtifactSink {
    root: PathBuf,
}

impl DirArtifactSink {
    /// Create a sink rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path an artifact name maps to.
    pub fn path_of(&self, folder: &str, filename: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(folder.split('/'));
        path.push(filename);
        path
    }
}

impl ArtifactSink for DirArtifactSink {
    fn store(&mut self, folder: &str, filename: &str, bytes: &[u8]) -> Result<StoredArtifact, SinkError> {
        check_names(folder, filename)?;
        let path = self.path_of(folder, filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, bytes).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact file");
        Ok(StoredArtifact {
            id: blob_hash(bytes),
            folder: folder.to_owned(),
            filename: filename.to_owned(),
            byte_length: bytes.len(),
        })
    }
}
