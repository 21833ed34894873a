// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Level mosaics, the composite descriptor and flattened rasters.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracker_cas::{ArtifactSink, StoredArtifact};

use crate::error::PanHistoryError;
use crate::extract::{ExtractedArea, ZoomPatch};
use crate::report::{report, PanHistoryReport};
use crate::source::Patch;

/// Largest mosaic or flattened raster, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// File name of the composite descriptor artifact.
pub const DESCRIPTOR_FILENAME: &str = "composite.json";

/// Placement of one source in the composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Offset from the composite's left edge, native pixels.
    pub x: i64,
    /// Offset from the composite's top edge, native pixels.
    pub y: i64,
    /// Native pixels per source pixel.
    pub scale: u32,
}

/// One positioned image in the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSource {
    /// Artifact file name, relative to the descriptor.
    pub path: String,
    /// Layer index.
    pub z: u32,
    /// Placement.
    pub position: Position,
    /// Optional renderer style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
}

/// Declarative multi-resolution composite: sources ordered coarse to fine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeDescriptor {
    /// Positioned sources.
    pub sources: Vec<CompositeSource>,
}

/// Result of writing a composite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composite {
    /// The descriptor that was written.
    pub descriptor: CompositeDescriptor,
    /// Receipt for the descriptor artifact.
    pub descriptor_artifact: StoredArtifact,
    /// Receipts for the level mosaics, coarse first.
    pub mosaics: Vec<StoredArtifact>,
    /// Geometry the composite was built from.
    pub report: PanHistoryReport,
}

fn offset_in_level(level: &ZoomPatch, native: i64, level_origin: i64) -> u32 {
    let cells = (native - level_origin) / i64::from(level.upscale);
    u32::try_from(cells.max(0)).unwrap_or(u32::MAX)
}

fn fits(width: u64, height: u64) -> bool {
    width.saturating_mul(height) <= MAX_CANVAS_PIXELS
        && u32::try_from(width).is_ok()
        && u32::try_from(height).is_ok()
}

fn alloc_canvas(width: u64, height: u64) -> Option<RgbaImage> {
    if !fits(width, height) {
        return None;
    }
    let w = u32::try_from(width).ok()?;
    let h = u32::try_from(height).ok()?;
    Some(RgbaImage::new(w.max(1), h.max(1)))
}

/// Place every patch of `level` in its local raster.
///
/// A patch lands at `(roi - level) / upscale` with integer division and is
/// never resized. The canvas spans the placed patches.
pub fn level_mosaic(level: &ZoomPatch, patches: &[Patch]) -> Result<RgbaImage, PanHistoryError> {
    let placed: Vec<(u32, u32, &Patch)> = level
        .rois
        .iter()
        .zip(patches)
        .map(|(roi, patch)| {
            (
                offset_in_level(level, roi.left, level.left()),
                offset_in_level(level, roi.top, level.top()),
                patch,
            )
        })
        .collect();
    let width = placed
        .iter()
        .map(|(x, _, p)| u64::from(*x) + u64::from(p.pixels.width()))
        .max()
        .unwrap_or(1);
    let height = placed
        .iter()
        .map(|(_, y, p)| u64::from(*y) + u64::from(p.pixels.height()))
        .max()
        .unwrap_or(1);
    let mut canvas = alloc_canvas(width, height).ok_or(PanHistoryError::MosaicTooLarge {
        level: level.zoom,
        width,
        height,
    })?;
    for (x, y, patch) in placed {
        imageops::replace(&mut canvas, &patch.pixels, i64::from(x), i64::from(y));
    }
    Ok(canvas)
}

/// Encode `image` as PNG.
pub fn encode_png(image: &RgbaImage, what: &str) -> Result<Vec<u8>, PanHistoryError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| PanHistoryError::Encode {
            what: what.to_owned(),
            source,
        })?;
    Ok(bytes)
}

/// File name of a level mosaic artifact.
pub fn mosaic_filename(zoom: u32) -> String {
    format!("level_{zoom}.png")
}

/// Build, encode and write every level mosaic, then the descriptor.
///
/// All mosaics are encoded before the first write. The descriptor is written
/// last, so a sink failure never leaves a descriptor pointing at missing
/// mosaics.
pub fn assemble<K>(
    extracted: &ExtractedArea,
    sink: &mut K,
    destination: &str,
) -> Result<Composite, PanHistoryError>
where
    K: ArtifactSink + ?Sized,
{
    let area = &extracted.area;
    let encoded = area
        .levels
        .values()
        .map(|level| {
            let patches = extracted
                .patches
                .get(&level.zoom)
                .map_or(&[][..], Vec::as_slice);
            let mosaic = level_mosaic(level, patches)?;
            let filename = mosaic_filename(level.zoom);
            let bytes = encode_png(&mosaic, &filename)?;
            debug!(zoom = level.zoom, width = mosaic.width(), height = mosaic.height(), "encoded level mosaic");
            Ok((level, filename, bytes))
        })
        .collect::<Result<Vec<_>, PanHistoryError>>()?;

    let mut mosaics = Vec::with_capacity(encoded.len());
    let mut sources = Vec::with_capacity(encoded.len());
    for (level, filename, bytes) in encoded {
        let stored = sink.store(destination, &filename, &bytes)?;
        sources.push(CompositeSource {
            path: stored.filename.clone(),
            z: 0,
            position: Position {
                x: level.left() - area.bounds.left(),
                y: level.top() - area.bounds.top(),
                scale: level.upscale,
            },
            style: None,
        });
        mosaics.push(stored);
    }

    let descriptor = CompositeDescriptor { sources };
    let json = serde_json::to_vec_pretty(&descriptor)?;
    let descriptor_artifact = sink.store(destination, DESCRIPTOR_FILENAME, &json)?;
    info!(
        destination,
        sources = descriptor.sources.len(),
        descriptor = %descriptor_artifact.id,
        "wrote composite"
    );
    Ok(Composite {
        descriptor,
        descriptor_artifact,
        mosaics,
        report: report(area),
    })
}

fn ceil_div(value: i64, divisor: u32) -> u64 {
    let divisor = i64::from(divisor);
    u64::try_from((value + divisor - 1).div_euclid(divisor)).unwrap_or(0)
}

/// Render the composite into a single raster.
///
/// `scale` is native pixels per output pixel and defaults to the coarsest
/// level's upscale factor. Levels are drawn coarse to fine, each mosaic
/// resized by `upscale / scale`.
pub fn flatten(extracted: &ExtractedArea, scale: Option<u32>) -> Result<RgbaImage, PanHistoryError> {
    let area = &extracted.area;
    let scale = match scale {
        Some(0) => return Err(PanHistoryError::ZeroScale),
        Some(s) => s,
        None => area.levels.values().map(|l| l.upscale).max().unwrap_or(1),
    };
    let (width, height) = (
        ceil_div(area.bounds.width(), scale),
        ceil_div(area.bounds.height(), scale),
    );
    let mut canvas =
        alloc_canvas(width, height).ok_or(PanHistoryError::RasterTooLarge { width, height })?;
    for level in area.levels.values() {
        let patches = extracted
            .patches
            .get(&level.zoom)
            .map_or(&[][..], Vec::as_slice);
        let mosaic = level_mosaic(level, patches)?;
        let resized_w = (u64::from(mosaic.width()) * u64::from(level.upscale)).div_ceil(u64::from(scale));
        let resized_h = (u64::from(mosaic.height()) * u64::from(level.upscale)).div_ceil(u64::from(scale));
        if !fits(resized_w, resized_h) {
            return Err(PanHistoryError::MosaicTooLarge {
                level: level.zoom,
                width: resized_w,
                height: resized_h,
            });
        }
        let layer = if level.upscale == scale {
            mosaic
        } else {
            imageops::resize(
                &mosaic,
                u32::try_from(resized_w.max(1)).unwrap_or(1),
                u32::try_from(resized_h.max(1)).unwrap_or(1),
                FilterType::Triangle,
            )
        };
        let x = (level.left() - area.bounds.left()).div_euclid(i64::from(scale));
        let y = (level.top() - area.bounds.top()).div_euclid(i64::from(scale));
        imageops::overlay(&mut canvas, &layer, x, y);
    }
    debug!(scale, width = canvas.width(), height = canvas.height(), "flattened composite");
    Ok(canvas)
}
