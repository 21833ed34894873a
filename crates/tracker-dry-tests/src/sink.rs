// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording artifact sink.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tracker_cas::{blob_hash, ArtifactSink, SinkError, StoredArtifact};

/// One artifact handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// Destination folder.
    pub folder: String,
    /// File name.
    pub filename: String,
    /// Stored bytes.
    pub bytes: Vec<u8>,
}

/// Fake [`ArtifactSink`] that keeps every write in order.
///
/// [`fail_after`](RecordingSink::fail_after) makes the sink accept `n` writes
/// and fail every later one, which exercises abort paths mid-composite.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    writes: Vec<Recorded>,
    attempts: usize,
    fail_after: Option<usize>,
}

impl RecordingSink {
    /// Sink that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Accept `n` more writes, then fail.
    pub fn fail_after(&self, n: usize) {
        let mut inner = self.lock();
        inner.fail_after = Some(inner.attempts + n);
    }

    /// Successful writes, in order.
    pub fn writes(&self) -> Vec<Recorded> {
        self.lock().writes.clone()
    }

    /// File names written, in order.
    pub fn filenames(&self) -> Vec<String> {
        self.lock().writes.iter().map(|w| w.filename.clone()).collect()
    }

    /// Write attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Bytes of the last write named `filename`.
    pub fn bytes_of(&self, filename: &str) -> Option<Vec<u8>> {
        self.lock()
            .writes
            .iter()
            .rev()
            .find(|w| w.filename == filename)
            .map(|w| w.bytes.clone())
    }
}

impl ArtifactSink for RecordingSink {
    fn store(&mut self, folder: &str, filename: &str, bytes: &[u8]) -> Result<StoredArtifact, SinkError> {
        let mut inner = self.lock();
        inner.attempts += 1;
        if inner.fail_after.is_some_and(|limit| inner.attempts > limit) {
            return Err(SinkError::Io {
                path: PathBuf::from(folder).join(filename),
                source: io::Error::other("simulated sink failure"),
            });
        }
        inner.writes.push(Recorded {
            folder: folder.to_owned(),
            filename: filename.to_owned(),
            bytes: bytes.to_vec(),
        });
        Ok(StoredArtifact {
            id: blob_hash(bytes),
            folder: folder.to_owned(),
            filename: filename.to_owned(),
            byte_length: bytes.len(),
        })
    }
}
