// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use serde::Serialize;

use crate::types::bounds::Bounds;
use crate::types::point::Point;

/// Rectangle in source-image pixel space.
///
/// Invariants:
/// - `left <= right` and `top <= bottom`.
/// - Coordinates are non-negative; viewport corners that fall outside the
///   image on the negative side are clamped to zero on construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PixelRect {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl PixelRect {
    /// Constructs a rectangle from its edges.
    ///
    /// Returns `None` if `right < left` or `bottom < top`.
    #[must_use]
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Option<Self> {
        if right < left || bottom < top {
            return None;
        }
        Some(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Builds a rectangle from a top-left and bottom-right viewport corner.
    ///
    /// Each coordinate is clamped at zero and truncated toward zero. If a
    /// rotated viewport puts `br` above or left of `tl`, the pair is ordered
    /// so the invariants hold.
    #[must_use]
    pub fn from_corners(tl: (f64, f64), br: (f64, f64)) -> Self {
        let (x0, x1) = (clamp_coord(tl.0), clamp_coord(br.0));
        let (y0, y1) = (clamp_coord(tl.1), clamp_coord(br.1));
        Self {
            left: x0.min(x1),
            top: y0.min(y1),
            right: x0.max(x1),
            bottom: y0.max(y1),
        }
    }

    /// Left edge (inclusive).
    #[must_use]
    pub const fn left(&self) -> u32 {
        self.left
    }

    /// Top edge (inclusive).
    #[must_use]
    pub const fn top(&self) -> u32 {
        self.top
    }

    /// Right edge (exclusive).
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.right
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.bottom
    }

    /// Horizontal extent in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Vertical extent in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Area in square pixels.
    ///
    /// Computed as `(left - right) * (top - bottom)` in signed arithmetic;
    /// both factors are non-positive so the product is non-negative.
    #[must_use]
    pub fn area(&self) -> i64 {
        (i64::from(self.left) - i64::from(self.right))
            * (i64::from(self.top) - i64::from(self.bottom))
    }

    /// Returns `true` when the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.left == self.right || self.top == self.bottom
    }

    /// Area shared with `other`; zero when the rectangles are disjoint or
    /// only touch along an edge.
    #[must_use]
    pub fn overlap_area(&self, other: &Self) -> i64 {
        let w = i64::from(self.right.min(other.right)) - i64::from(self.left.max(other.left));
        let h = i64::from(self.bottom.min(other.bottom)) - i64::from(self.top.max(other.top));
        w.max(0) * h.max(0)
    }

    /// Top-left corner as a signed point.
    #[must_use]
    pub fn top_left(&self) -> Point {
        Point::new(i64::from(self.left), i64::from(self.top))
    }

    /// Bottom-right corner as a signed point.
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        Point::new(i64::from(self.right), i64::from(self.bottom))
    }

    /// Integer pixel midpoint (floor of the exact center).
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            (i64::from(self.left) + i64::from(self.right)).div_euclid(2),
            (i64::from(self.top) + i64::from(self.bottom)).div_euclid(2),
        )
    }

    /// The rectangle expressed relative to `origin`.
    #[must_use]
    pub fn relative_to(&self, origin: Point) -> Bounds {
        Bounds::from_corners(self.top_left().sub(&origin), self.bottom_right().sub(&origin))
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float-to-int casts saturate; NaN maps to 0"
)]
fn clamp_coord(v: f64) -> u32 {
    v.max(0.0) as u32
}
