// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Activity log queries: filter, inclusive time window, sort and paging.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::event::ActivityEvent;

/// Inclusive `epochms` window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Earliest accepted timestamp.
    pub start: f64,
    /// Latest accepted timestamp.
    pub end: f64,
}

impl TimeRange {
    /// Creates a window covering `[start, end]`.
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `epochms` lies inside the window (both ends inclusive).
    pub fn contains(&self, epochms: f64) -> bool {
        self.start <= epochms && epochms <= self.end
    }
}

/// Field used to order query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Browser timestamp.
    #[default]
    Epochms,
    /// Per-session sequence id.
    SequenceId,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[serde(alias = "ascending")]
    Asc,
    /// Largest first.
    #[default]
    #[serde(alias = "descending")]
    Desc,
}

/// Result ordering. Defaults to newest `epochms` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    /// Field to order by.
    pub key: SortKey,
    /// Direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending by `epochms`.
    pub const OLDEST_FIRST: Self = Self {
        key: SortKey::Epochms,
        direction: SortDirection::Asc,
    };

    /// Descending by `epochms`.
    pub const NEWEST_FIRST: Self = Self {
        key: SortKey::Epochms,
        direction: SortDirection::Desc,
    };

    /// Total order over events. Ties on the key fall back to
    /// `(session, sequence_id)` ascending so results are deterministic.
    pub fn compare(&self, a: &ActivityEvent, b: &ActivityEvent) -> Ordering {
        let primary = match self.key {
            SortKey::Epochms => a.epochms.total_cmp(&b.epochms),
            SortKey::SequenceId => a.sequence_id.cmp(&b.sequence_id),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.key().cmp(&b.key()))
    }
}

/// Selection over the activity log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivityQuery {
    /// Only events whose viewer state shows this image.
    pub current_image: Option<String>,
    /// Only events with this activity tag.
    pub activity: Option<String>,
    /// Only events inside this inclusive window.
    pub time_range: Option<TimeRange>,
    /// Result ordering.
    pub sort: Sort,
    /// Maximum number of results; `None` for all.
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    pub offset: usize,
}

impl ActivityQuery {
    /// Query matching every event, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one image.
    pub fn image(mut self, image_id: impl Into<String>) -> Self {
        self.current_image = Some(image_id.into());
        self
    }

    /// Restrict to one activity tag.
    pub fn activity(mut self, kind: impl Into<String>) -> Self {
        self.activity = Some(kind.into());
        self
    }

    /// Restrict to `[start, end]`.
    pub fn between(mut self, start: f64, end: f64) -> Self {
        self.time_range = Some(TimeRange::new(start, end));
        self
    }

    /// Set the result ordering.
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Set paging.
    pub fn page(mut self, limit: Option<usize>, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Returns `true` if `event` passes every filter.
    pub fn matches(&self, event: &ActivityEvent) -> bool {
        if let Some(image) = &self.current_image {
            if event.current_image() != Some(image.as_str()) {
                return false;
            }
        }
        if let Some(kind) = &self.activity {
            if event.activity.kind() != kind {
                return false;
            }
        }
        self.time_range
            .is_none_or(|range| range.contains(event.epochms))
    }

    /// Filters, sorts and pages `events`.
    pub fn run<'a, I>(&self, events: I) -> Vec<ActivityEvent>
    where
        I: IntoIterator<Item = &'a ActivityEvent>,
    {
        let mut hits: Vec<&ActivityEvent> = events.into_iter().filter(|e| self.matches(e)).collect();
        hits.sort_by(|a, b| self.sort.compare(a, b));
        hits.into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
