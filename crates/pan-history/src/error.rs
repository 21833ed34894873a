// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hard failures of a reconstruction.
//!
//! Expected absence (no events, unknown image) is `Ok(None)` and never
//! reaches this type.

use thiserror::Error;
use tracker_activity::LogError;
use tracker_app_core::prefs::PrefsError;
use tracker_cas::SinkError;

use crate::source::SourceError;

/// Errors that abort a reconstruction.
#[derive(Debug, Error)]
pub enum PanHistoryError {
    /// Request preferences are out of range.
    #[error("invalid reconstruction preferences: {0}")]
    Prefs(#[from] PrefsError),
    /// The activity log query failed.
    #[error("activity log query failed: {0}")]
    Log(#[from] LogError),
    /// Metadata lookup or a region fetch failed.
    #[error("pyramid source failed: {0}")]
    Source(#[from] SourceError),
    /// Writing an artifact failed.
    #[error("artifact sink failed: {0}")]
    Sink(#[from] SinkError),
    /// A level mosaic would exceed the pixel limit.
    #[error("mosaic for level {level} is too large ({width}x{height})")]
    MosaicTooLarge {
        /// Zoom level.
        level: u32,
        /// Requested width.
        width: u64,
        /// Requested height.
        height: u64,
    },
    /// A flattened raster would exceed the pixel limit.
    #[error("flattened raster is too large ({width}x{height})")]
    RasterTooLarge {
        /// Requested width.
        width: u64,
        /// Requested height.
        height: u64,
    },
    /// The flatten scale was zero.
    #[error("flatten scale must be at least 1")]
    ZeroScale,
    /// PNG encoding failed.
    #[error("failed to encode {what}: {source}")]
    Encode {
        /// Artifact being encoded.
        what: String,
        /// Encoder error.
        #[source]
        source: image::ImageError,
    },
    /// The composite descriptor could not be serialized.
    #[error("failed to serialize composite descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
}
