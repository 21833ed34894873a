//! Core geometry types used by the reconstruction engine.
//!
//! Conventions:
//! - `x` grows rightward and `y` grows downward, as in image rasters.
//! - Rectangles are half-open: `right` and `bottom` are one past the last
//!   covered pixel, so `width = right - left`.

#[doc = "Axis-aligned signed bounds folded from points."]
pub mod bounds;
#[doc = "Signed 2D points."]
pub mod point;
#[doc = "Unsigned source-pixel rectangles."]
pub mod rect;
