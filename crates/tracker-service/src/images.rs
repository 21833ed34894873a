// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Image files on disk as a [`PyramidSource`].
//!
//! A flat image `<root>/<id>.{png,jpg,jpeg}` is presented as a virtual
//! pyramid: level `levels - 1` is native resolution and each coarser level
//! halves it until the long side fits in one 256 px tile. Regions are cut
//! from the full-resolution image and resampled to the requested
//! magnification.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use pan_history::{ImageMeta, Patch, PyramidSource, SourceError};
use tracing::debug;
use tracker_geom::PixelRect;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const TILE: u32 = 256;

/// Number of levels for a `width` by `height` image.
pub fn pyramid_levels(width: u32, height: u32) -> u32 {
    let mut side = width.max(height);
    let mut levels = 1;
    while side > TILE {
        side = side.div_ceil(2);
        levels += 1;
    }
    levels
}

/// Directory of flat images served as pyramids.
pub struct DirImageSource {
    root: PathBuf,
    magnification: f64,
    // Last decoded image; a reconstruction fetches many regions of one image.
    decoded: Mutex<Option<(String, Arc<RgbaImage>)>>,
}

impl DirImageSource {
    /// Serve images under `root`, all scanned at `magnification`.
    pub fn new(root: impl Into<PathBuf>, magnification: f64) -> Self {
        Self {
            root: root.into(),
            magnification,
            decoded: Mutex::new(None),
        }
    }

    /// Image directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, image_id: &str) -> Option<PathBuf> {
        if image_id.is_empty() || image_id.starts_with('.') || image_id.contains(['/', '\\', '\0']) {
            return None;
        }
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{image_id}.{ext}")))
            .find(|path| path.is_file())
    }

    fn load(&self, image_id: &str) -> Result<Arc<RgbaImage>, SourceError> {
        let mut decoded = self.decoded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((id, pixels)) = decoded.as_ref() {
            if id == image_id {
                return Ok(Arc::clone(pixels));
            }
        }
        let path = self
            .locate(image_id)
            .ok_or_else(|| SourceError::NotFound(image_id.to_owned()))?;
        let pixels = Arc::new(image::open(&path)?.to_rgba8());
        debug!(image_id, path = %path.display(), width = pixels.width(), height = pixels.height(), "decoded image");
        *decoded = Some((image_id.to_owned(), Arc::clone(&pixels)));
        Ok(pixels)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "factor is at most 1 for any level of the pyramid"
)]
fn scaled(len: u32, factor: f64) -> u32 {
    ((f64::from(len) * factor).ceil() as u32).max(1)
}

impl PyramidSource for DirImageSource {
    fn metadata(&self, image_id: &str) -> Result<Option<ImageMeta>, SourceError> {
        let Some(path) = self.locate(image_id) else {
            return Ok(None);
        };
        let (width, height) = image::image_dimensions(&path)?;
        Ok(Some(ImageMeta {
            size_x: Some(width),
            size_y: Some(height),
            levels: pyramid_levels(width, height),
            magnification: Some(self.magnification),
        }))
    }

    fn region(&self, image_id: &str, rect: PixelRect, magnification: f64) -> Result<Patch, SourceError> {
        if !(magnification.is_finite() && magnification > 0.0) || magnification > self.magnification {
            return Err(SourceError::Magnification(magnification));
        }
        let full = self.load(image_id)?;
        let factor = magnification / self.magnification;

        // Viewports come from clients and may reach far past the image; only
        // the part that overlaps it is rendered.
        let (x, y) = (rect.left().min(full.width()), rect.top().min(full.height()));
        let w = rect.right().min(full.width()) - x;
        let h = rect.bottom().min(full.height()) - y;
        let pixels = if w > 0 && h > 0 {
            let cut = imageops::crop_imm(&*full, x, y, w, h).to_image();
            if (factor - 1.0).abs() < f64::EPSILON {
                cut
            } else {
                imageops::resize(&cut, scaled(w, factor), scaled(h, factor), FilterType::Triangle)
            }
        } else {
            RgbaImage::new(1, 1)
        };
        Ok(Patch {
            pixels,
            mime_type: "image/png".into(),
        })
    }
}
