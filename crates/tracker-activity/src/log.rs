// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Activity log port.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::event::ActivityEvent;
use crate::query::ActivityQuery;
use crate::validate::ValidationError;

/// Errors raised by activity log adapters.
#[derive(Debug, Error)]
pub enum LogError {
    /// An entry failed validation; nothing from the batch was written.
    #[error("invalid activity at index {index}: {source}")]
    Invalid {
        /// Position of the offending entry in the submitted batch.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: ValidationError,
    },
    /// I/O error while reading or writing backing storage.
    #[error("activity log io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure while writing a record.
    #[error("activity log serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Backing storage holds a record that cannot be replayed.
    #[error("activity journal line {line} is corrupt: {reason}")]
    Corrupt {
        /// 1-based line number.
        line: usize,
        /// Decoder or validation message.
        reason: String,
    },
}

/// Outcome of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// The event was new and is now stored.
    Inserted,
    /// An event with the same `(session, sequence_id)` was already stored;
    /// the log is unchanged.
    AlreadyPresent,
}

/// Append-only activity log keyed by `(session, sequence_id)`.
///
/// # Absence Semantics
///
/// [`query`](ActivityLog::query) returns an empty vector when nothing
/// matches; that is not an error.
pub trait ActivityLog {
    /// Store `event` unless its key is already present.
    ///
    /// Re-submitting a key never updates the stored fields.
    fn append(&mut self, event: ActivityEvent) -> Result<Appended, LogError>;

    /// Run `query` against stored events.
    fn query(&self, query: &ActivityQuery) -> Result<Vec<ActivityEvent>, LogError>;

    /// Number of stored events.
    fn len(&self) -> usize;

    /// Returns `true` if the log holds no events.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validates and appends a batch of raw activity objects.
///
/// The whole batch is validated before anything is written. Returns, per
/// session, the sorted sequence ids from the batch that are present in the
/// log afterwards (newly inserted or already stored).
pub fn log_activities<L>(log: &mut L, entries: Vec<Value>) -> Result<BTreeMap<String, Vec<u64>>, LogError>
where
    L: ActivityLog + ?Sized,
{
    let events = entries
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            ActivityEvent::from_value(raw).map_err(|source| LogError::Invalid { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut saved: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
    let mut inserted = 0usize;
    for event in events {
        let key = (event.session.clone(), event.sequence_id);
        if log.append(event)? == Appended::Inserted {
            inserted += 1;
        }
        saved.entry(key.0).or_default().insert(key.1);
    }
    debug!(inserted, sessions = saved.len(), "logged activity batch");

    Ok(saved
        .into_iter()
        .map(|(session, ids)| (session, ids.into_iter().collect()))
        .collect())
}
