// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Browser activity events and the append-only log that stores them.
//!
//! `tracker-activity` provides the [`ActivityEvent`] model (a tagged sum type
//! over the activity kinds a viewer reports), write-time validation, and the
//! [`ActivityLog`] port with two adapters: [`LocalActivityLog`] (memory) and
//! [`JournalActivityLog`] (JSON-lines file).
//!
//! # Dedup Invariant
//!
//! `(session, sequence_id)` identifies an event. Appending an existing key is
//! a no-op: it neither duplicates nor updates the stored record, so clients
//! may resend batches freely.
#![forbid(unsafe_code)]

mod event;
mod journal;
mod local;
mod log;
mod query;
mod validate;

pub use event::{
    Activity, ActivityEvent, Coord, ExperimentInput, ExperimentState, ImagePosition, KeyInput,
    Modifiers, PointerInput, ScreenSize, ViewState, VisibleArea,
};
pub use journal::JournalActivityLog;
pub use local::LocalActivityLog;
pub use log::{log_activities, ActivityLog, Appended, LogError};
pub use query::{ActivityQuery, Sort, SortDirection, SortKey, TimeRange};
pub use validate::ValidationError;
