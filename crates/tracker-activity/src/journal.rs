// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON-lines journal backing for the activity log.
//!
//! One line per stored event, appended as events arrive. On open the journal
//! is replayed into a [`LocalActivityLog`]; duplicate keys in the file are
//! tolerated and collapse to the first occurrence. An unterminated final
//! line that does not parse is a write cut short by a crash; it is
//! truncated away instead of failing the open.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::event::ActivityEvent;
use crate::local::LocalActivityLog;
use crate::log::{ActivityLog, Appended, LogError};
use crate::query::ActivityQuery;

enum Repair {
    /// Cut the file back to this many bytes.
    Truncate(usize),
    /// The last record is whole but lacks its newline.
    Terminate,
}

/// Activity log persisted as an append-only JSON-lines file.
#[derive(Debug)]
pub struct JournalActivityLog {
    path: PathBuf,
    file: File,
    inner: LocalActivityLog,
}

impl JournalActivityLog {
    /// Open (or create) the journal at `path` and replay its contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut inner = LocalActivityLog::new();
        let mut repair = None;
        if path.exists() {
            let bytes = fs::read(&path)?;
            let mut start = 0;
            for (index, line) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
                let terminated = line.ends_with(b"\n");
                if !line.trim_ascii().is_empty() {
                    match serde_json::from_slice::<ActivityEvent>(line) {
                        Ok(event) => {
                            inner.append(event)?;
                        }
                        Err(err) if !terminated => {
                            warn!(path = %path.display(), line = index + 1, %err, "dropping torn journal tail");
                            repair = Some(Repair::Truncate(start));
                            break;
                        }
                        Err(err) => {
                            return Err(LogError::Corrupt {
                                line: index + 1,
                                reason: err.to_string(),
                            });
                        }
                    }
                }
                start += line.len();
            }
            if repair.is_none() && bytes.last().is_some_and(|b| *b != b'\n') {
                repair = Some(Repair::Terminate);
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        match repair {
            Some(Repair::Truncate(len)) => file.set_len(u64::try_from(len).unwrap_or(u64::MAX))?,
            Some(Repair::Terminate) => file.write_all(b"\n")?,
            None => {}
        }
        info!(path = %path.display(), events = inner.len(), "activity journal opened");
        Ok(Self { path, file, inner })
    }

    /// Location of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivityLog for JournalActivityLog {
    fn append(&mut self, event: ActivityEvent) -> Result<Appended, LogError> {
        if self.inner.contains(&event.session, event.sequence_id) {
            return Ok(Appended::AlreadyPresent);
        }
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        debug!(session = %event.session, sequence_id = event.sequence_id, "journaled activity");
        self.inner.append(event)
    }

    fn query(&self, query: &ActivityQuery) -> Result<Vec<ActivityEvent>, LogError> {
        self.inner.query(query)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
