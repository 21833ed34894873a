// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory activity log.

use std::collections::HashSet;

use crate::event::ActivityEvent;
use crate::log::{ActivityLog, Appended, LogError};
use crate::query::ActivityQuery;

/// In-memory, Vec-backed activity log.
///
/// Events are kept in arrival order next to a key index that enforces the
/// `(session, sequence_id)` uniqueness invariant.
#[derive(Debug, Default, Clone)]
pub struct LocalActivityLog {
    events: Vec<ActivityEvent>,
    keys: HashSet<(String, u64)>,
}

impl LocalActivityLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an event with this key is stored.
    pub fn contains(&self, session: &str, sequence_id: u64) -> bool {
        self.keys.contains(&(session.to_owned(), sequence_id))
    }

    /// Stored events in arrival order.
    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }
}

impl ActivityLog for LocalActivityLog {
    fn append(&mut self, event: ActivityEvent) -> Result<Appended, LogError> {
        if !self.keys.insert((event.session.clone(), event.sequence_id)) {
            return Ok(Appended::AlreadyPresent);
        }
        self.events.push(event);
        Ok(Appended::Inserted)
    }

    fn query(&self, query: &ActivityQuery) -> Result<Vec<ActivityEvent>, LogError> {
        Ok(query.run(&self.events))
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}
