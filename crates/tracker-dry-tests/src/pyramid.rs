// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Synthetic pyramid source.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use image::{Rgba, RgbaImage};
use pan_history::{ImageMeta, Patch, PyramidSource, SourceError};
use tracker_geom::PixelRect;

/// One recorded `region` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionCall {
    /// Requested rectangle in native pixels.
    pub rect: PixelRect,
    /// Requested magnification.
    pub magnification: f64,
}

/// Fake [`PyramidSource`] that renders solid patches.
///
/// A region at magnification `m` of an image with native magnification `n`
/// comes back as `ceil(width * m / n)` by `ceil(height * m / n)` pixels
/// filled with [`SyntheticPyramid::shade`]`(m)`, so tests can tell levels
/// apart by color.
#[derive(Clone, Default)]
pub struct SyntheticPyramid {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    images: BTreeMap<String, ImageMeta>,
    calls: Vec<RegionCall>,
    fail_on_region: bool,
}

impl SyntheticPyramid {
    /// Source with no images.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pyramidal image with native magnification 20.
    pub fn with_pyramid(self, image_id: &str, width: u32, height: u32, levels: u32) -> Self {
        self.with_meta(
            image_id,
            ImageMeta {
                size_x: Some(width),
                size_y: Some(height),
                levels,
                magnification: Some(20.0),
            },
        )
    }

    /// Add an image with explicit metadata.
    pub fn with_meta(self, image_id: &str, meta: ImageMeta) -> Self {
        self.lock().images.insert(image_id.to_owned(), meta);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make subsequent region fetches fail.
    pub fn set_fail_on_region(&self, fail: bool) {
        self.lock().fail_on_region = fail;
    }

    /// Region calls so far, in order.
    pub fn region_calls(&self) -> Vec<RegionCall> {
        self.lock().calls.clone()
    }

    /// Fill color for patches rendered at `magnification`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped to the u8 range"
    )]
    pub fn shade(magnification: f64) -> Rgba<u8> {
        let v = (magnification * 8.0).round().clamp(0.0, 255.0) as u8;
        Rgba([v, 255 - v, 128, 255])
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "dimensions are bounded by the requested rectangle"
    )]
    fn scaled(len: u32, factor: f64) -> u32 {
        ((f64::from(len) * factor).ceil() as u32).max(1)
    }
}

impl PyramidSource for SyntheticPyramid {
    fn metadata(&self, image_id: &str) -> Result<Option<ImageMeta>, SourceError> {
        Ok(self.lock().images.get(image_id).copied())
    }

    fn region(&self, image_id: &str, rect: PixelRect, magnification: f64) -> Result<Patch, SourceError> {
        let mut inner = self.lock();
        inner.calls.push(RegionCall { rect, magnification });
        if inner.fail_on_region {
            return Err(SourceError::Other("simulated region failure".into()));
        }
        let meta = inner
            .images
            .get(image_id)
            .ok_or_else(|| SourceError::NotFound(image_id.to_owned()))?;
        if !(magnification.is_finite() && magnification > 0.0) {
            return Err(SourceError::Magnification(magnification));
        }
        let factor = magnification / meta.magnification.unwrap_or(20.0);
        let pixels = RgbaImage::from_pixel(
            Self::scaled(rect.width(), factor),
            Self::scaled(rect.height(), factor),
            Self::shade(magnification),
        );
        Ok(Patch {
            pixels,
            mime_type: "image/png".into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn patches_scale_with_magnification() {
        let source = SyntheticPyramid::new().with_pyramid("img", 1000, 1000, 4);
        let rect = PixelRect::new(0, 0, 100, 60).unwrap();
        let patch = source.region("img", rect, 5.0).unwrap();
        assert_eq!(patch.pixels.dimensions(), (25, 15));
        assert_eq!(patch.pixels.get_pixel(0, 0), &SyntheticPyramid::shade(5.0));
        assert_eq!(source.region_calls().len(), 1);
    }

    #[test]
    fn unknown_image_and_failures() {
        let source = SyntheticPyramid::new();
        assert!(source.metadata("nope").unwrap().is_none());
        let rect = PixelRect::new(0, 0, 1, 1).unwrap();
        assert!(matches!(source.region("nope", rect, 1.0), Err(SourceError::NotFound(_))));
        source.set_fail_on_region(true);
        assert!(matches!(source.region("nope", rect, 1.0), Err(SourceError::Other(_))));
    }
}
