// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pyramid metadata and pixel-region port.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker_geom::PixelRect;

/// Metadata describing a pyramidal image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    /// Full-resolution width in pixels. `None` for non-pyramidal images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_x: Option<u32>,
    /// Full-resolution height in pixels. `None` for non-pyramidal images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_y: Option<u32>,
    /// Number of resolution levels; level `levels - 1` is native resolution.
    pub levels: u32,
    /// Native objective magnification, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnification: Option<f64>,
}

impl ImageMeta {
    /// Returns `true` if the image has pyramidal dimensions.
    pub fn is_pyramidal(&self) -> bool {
        self.size_x.is_some() && self.size_y.is_some() && self.levels > 0
    }
}

/// Pixels fetched for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// RGBA pixel buffer.
    pub pixels: RgbaImage,
    /// MIME type reported by the source.
    pub mime_type: String,
}

/// Errors raised by pyramid sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has no image with this id.
    #[error("image {0} not found")]
    NotFound(String),
    /// The requested magnification is not usable.
    #[error("invalid magnification {0}")]
    Magnification(f64),
    /// Reading the backing file failed.
    #[error("image io error: {0}")]
    Io(#[from] std::io::Error),
    /// Decoding or resampling failed.
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    /// Any other backend failure.
    #[error("{0}")]
    Other(String),
}

/// Read-only access to pyramidal images.
///
/// # Absence Semantics
///
/// [`metadata`](PyramidSource::metadata) returns `Ok(None)` for unknown
/// images. Region fetches for unknown images are errors.
pub trait PyramidSource {
    /// Metadata for `image_id`.
    fn metadata(&self, image_id: &str) -> Result<Option<ImageMeta>, SourceError>;

    /// Pixels covering `rect` (native pixel coordinates) rendered at
    /// `magnification`. Sources may clip the patch to the image extent; it
    /// is placed at the rect's top-left corner either way.
    fn region(&self, image_id: &str, rect: PixelRect, magnification: f64) -> Result<Patch, SourceError>;
}

impl<T: PyramidSource + ?Sized> PyramidSource for &T {
    fn metadata(&self, image_id: &str) -> Result<Option<ImageMeta>, SourceError> {
        (**self).metadata(image_id)
    }

    fn region(&self, image_id: &str, rect: PixelRect, magnification: f64) -> Result<Patch, SourceError> {
        (**self).region(image_id, rect, magnification)
    }
}

impl<T: PyramidSource + ?Sized> PyramidSource for Arc<T> {
    fn metadata(&self, image_id: &str) -> Result<Option<ImageMeta>, SourceError> {
        (**self).metadata(image_id)
    }

    fn region(&self, image_id: &str, rect: PixelRect, magnification: f64) -> Result<Patch, SourceError> {
        (**self).region(image_id, rect, magnification)
    }
}
