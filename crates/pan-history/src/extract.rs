// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multi-scale layout and patch extraction.
//!
//! Level `levels - 1` of a pyramid is native resolution and each lower level
//! halves it, so level `z` is `2^(levels - 1 - z)` native pixels per level
//! pixel (its upscale factor).
//!
//! All coordinates in a [`PannedArea`] are relative to one origin: the
//! integer center of the first accepted region of the lowest retained level.
//! The origin depends only on the accepted regions, never on fetch order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracker_app_core::prefs::ReconstructionPrefs;
use tracker_geom::{Bounds, Point};

use crate::dedup::{AcceptedRegions, Roi};
use crate::source::{ImageMeta, Patch, PyramidSource, SourceError};

/// Native pixels per level pixel at `zoom`, or `None` if the level is
/// outside the pyramid.
pub fn upscale_factor(levels: u32, zoom: u32) -> Option<u32> {
    if zoom >= levels {
        return None;
    }
    1u32.checked_shl(levels - 1 - zoom)
}

/// Magnification a level renders at.
pub fn effective_magnification(base: f64, upscale: u32) -> f64 {
    base / f64::from(upscale)
}

/// One accepted region as reported: origin-relative, native pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    /// Left edge relative to the origin.
    pub left: i64,
    /// Top edge relative to the origin.
    pub top: i64,
    /// Width in native pixels.
    pub width: i64,
    /// Height in native pixels.
    pub height: i64,
    /// Zoom level.
    pub zoom: u32,
    /// Timestamp of the source event.
    pub epochms: f64,
}

/// Geometry of one retained zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomPatch {
    /// Zoom level.
    pub zoom: u32,
    /// Native pixels per level pixel.
    pub upscale: u32,
    /// Magnification used for region fetches.
    pub magnification: f64,
    /// Origin-relative bounds over every region's corners.
    pub bounds: Bounds,
    /// Accepted regions in native coordinates, processing order.
    pub regions: Vec<Roi>,
    /// Accepted regions relative to the origin, same order as `regions`.
    pub rois: Vec<RoiRecord>,
}

impl ZoomPatch {
    /// Left edge relative to the origin.
    pub fn left(&self) -> i64 {
        self.bounds.left()
    }

    /// Top edge relative to the origin.
    pub fn top(&self) -> i64 {
        self.bounds.top()
    }

    /// Width in native pixels.
    pub fn width(&self) -> i64 {
        self.bounds.width()
    }

    /// Height in native pixels.
    pub fn height(&self) -> i64 {
        self.bounds.height()
    }
}

/// Geometry of a whole reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct PannedArea {
    /// Union of all level bounds.
    pub bounds: Bounds,
    /// Shared origin in native coordinates.
    pub origin: Point,
    /// Retained levels keyed by zoom, coarse first.
    pub levels: BTreeMap<u32, ZoomPatch>,
}

/// A [`PannedArea`] plus the pixels for every region.
#[derive(Debug, Clone)]
pub struct ExtractedArea {
    /// Geometry.
    pub area: PannedArea,
    /// Patches per level, aligned with [`ZoomPatch::regions`].
    pub patches: BTreeMap<u32, Vec<Patch>>,
}

/// Pure geometry for `accepted` on a pyramid described by `meta`.
///
/// Returns `None` when `meta` is not pyramidal or no level survives.
pub fn layout(accepted: &AcceptedRegions, meta: &ImageMeta) -> Option<PannedArea> {
    if !meta.is_pyramidal() {
        return None;
    }
    let base = meta
        .magnification
        .unwrap_or(ReconstructionPrefs::MAGNIFICATION);
    let retained: Vec<(u32, u32, &[Roi])> = accepted
        .iter()
        .filter(|(_, rois)| !rois.is_empty())
        .filter_map(|(&zoom, rois)| Some((zoom, upscale_factor(meta.levels, zoom)?, rois.as_slice())))
        .collect();
    let discarded = accepted.len() - retained.len();
    if discarded > 0 {
        debug!(discarded, levels = meta.levels, "dropped zoom levels outside the pyramid");
    }

    let origin = retained.first()?.2.first()?.rect.center();
    let levels: BTreeMap<u32, ZoomPatch> = retained
        .into_iter()
        .filter_map(|(zoom, upscale, rois)| {
            let placed: Vec<Bounds> = rois.iter().map(|roi| roi.rect.relative_to(origin)).collect();
            let bounds = Bounds::union_all(placed.iter().copied())?;
            let records = rois
                .iter()
                .zip(&placed)
                .map(|(roi, b)| RoiRecord {
                    left: b.left(),
                    top: b.top(),
                    width: b.width(),
                    height: b.height(),
                    zoom,
                    epochms: roi.epochms,
                })
                .collect();
            Some((
                zoom,
                ZoomPatch {
                    zoom,
                    upscale,
                    magnification: effective_magnification(base, upscale),
                    bounds,
                    regions: rois.to_vec(),
                    rois: records,
                },
            ))
        })
        .collect();
    let bounds = Bounds::union_all(levels.values().map(|level| level.bounds))?;
    Some(PannedArea {
        bounds,
        origin,
        levels,
    })
}

/// Fetch the pixels for every region of `area`, level by level.
///
/// Fetches run sequentially; the first failure aborts.
pub fn fetch_patches<S>(area: PannedArea, source: &S, image_id: &str) -> Result<ExtractedArea, SourceError>
where
    S: PyramidSource + ?Sized,
{
    let mut patches = BTreeMap::new();
    for (zoom, level) in &area.levels {
        let fetched = level
            .regions
            .iter()
            .map(|roi| source.region(image_id, roi.rect, level.magnification))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(zoom, patches = fetched.len(), magnification = level.magnification, "fetched level patches");
        patches.insert(*zoom, fetched);
    }
    Ok(ExtractedArea { area, patches })
}

/// Layout plus pixel fetch.
///
/// `Ok(None)` when [`layout`] yields nothing; fetch failures are errors.
pub fn extract_patches<S>(
    accepted: &AcceptedRegions,
    meta: &ImageMeta,
    source: &S,
    image_id: &str,
) -> Result<Option<ExtractedArea>, SourceError>
where
    S: PyramidSource + ?Sized,
{
    let Some(area) = layout(accepted, meta) else {
        return Ok(None);
    };
    let extracted = fetch_patches(area, source, image_id)?;
    info!(
        image_id,
        levels = extracted.area.levels.len(),
        width = extracted.area.bounds.width(),
        height = extracted.area.bounds.height(),
        "extracted panned area"
    );
    Ok(Some(extracted))
}
