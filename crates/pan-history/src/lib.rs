// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pan-history reconstruction.
//!
//! Turns logged viewport events for one pyramidal image into a summary of
//! the regions a viewer actually looked at. Stages run strictly in order:
//!
//! 1. [`select`]: pan events in a time window whose zoom sits on a level.
//! 2. [`dedup`]: per level, a greedy overlap filter over viewport rectangles.
//! 3. [`extract`]: a shared origin, per-level and global bounds, then pixel
//!    fetches at each level's magnification.
//! 4. [`assemble`] / [`report`]: positioned level mosaics written through an
//!    [`ArtifactSink`](tracker_cas::ArtifactSink), or the bare geometry.
//!
//! [`pipeline`] strings the stages together. Expected absence (no events,
//! unknown image, no level inside the pyramid) is `Ok(None)`; I/O failures
//! are [`PanHistoryError`]s and abort the request.
#![forbid(unsafe_code)]

pub mod assemble;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod report;
pub mod select;
pub mod source;

pub use assemble::{Composite, CompositeDescriptor, CompositeSource, Position};
pub use error::PanHistoryError;
pub use extract::{ExtractedArea, PannedArea, RoiRecord, ZoomPatch};
pub use pipeline::{reconstruct_composite, reconstruct_raster, reconstruct_report, ReconstructionRequest, Selection};
pub use report::{LevelReport, PanHistoryReport};
pub use select::{PanEvent, PanQuery};
pub use source::{ImageMeta, Patch, PyramidSource, SourceError};
