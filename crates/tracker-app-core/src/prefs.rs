// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reconstruction tuning shared by the engine and the service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order in which pan events are fed to the overlap filter.
///
/// The filter is greedy, so earlier regions win ties. This order is applied
/// after the query and independently of the query's sort (which only drives
/// paging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DedupOrder {
    /// Ascending `epochms`, ties by `(session, sequence_id)`.
    #[default]
    OldestFirst,
    /// Descending `epochms`, ties by `(session, sequence_id)`.
    NewestFirst,
    /// Keep the order the log query returned.
    AsQueried,
}

/// A preference value is outside its usable range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrefsError {
    /// `zoom_precision` must be finite and in `(0, 1]`.
    #[error("zoomPrecision must be in (0, 1], got {0}")]
    ZoomPrecision(f64),
    /// `area_threshold` must be finite and non-negative.
    #[error("threshold must be a non-negative number, got {0}")]
    AreaThreshold(f64),
    /// `default_magnification` must be finite and positive.
    #[error("defaultMagnification must be positive, got {0}")]
    Magnification(f64),
}

/// Knobs for one reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconstructionPrefs {
    /// Grid step used to decide whether a zoom sits on an integer level.
    pub zoom_precision: f64,
    /// Maximum covered fraction before a region counts as a duplicate.
    pub area_threshold: f64,
    /// Processing order for the overlap filter.
    pub dedup_order: DedupOrder,
    /// Native magnification assumed when image metadata has none.
    pub default_magnification: f64,
}

impl ReconstructionPrefs {
    /// Default zoom precision.
    pub const ZOOM_PRECISION: f64 = 0.001;
    /// Default overlap threshold.
    pub const AREA_THRESHOLD: f64 = 0.95;
    /// Default native magnification.
    pub const MAGNIFICATION: f64 = 20.0;

    /// Check every field is usable.
    pub fn validate(&self) -> Result<(), PrefsError> {
        let p = self.zoom_precision;
        if !(p.is_finite() && p > 0.0 && p <= 1.0) {
            return Err(PrefsError::ZoomPrecision(p));
        }
        let t = self.area_threshold;
        if !(t.is_finite() && t >= 0.0) {
            return Err(PrefsError::AreaThreshold(t));
        }
        let m = self.default_magnification;
        if !(m.is_finite() && m > 0.0) {
            return Err(PrefsError::Magnification(m));
        }
        Ok(())
    }
}

impl Default for ReconstructionPrefs {
    fn default() -> Self {
        Self {
            zoom_precision: Self::ZOOM_PRECISION,
            area_threshold: Self::AREA_THRESHOLD,
            dedup_order: DedupOrder::default(),
            default_magnification: Self::MAGNIFICATION,
        }
    }
}
