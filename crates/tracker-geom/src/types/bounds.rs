// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use serde::Serialize;

use crate::types::point::Point;

/// Axis-aligned bounds in signed (origin-relative) pixel space.
///
/// Invariants:
/// - `min` components are less than or equal to `max` components.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Bounds {
    min: Point,
    max: Point,
}

impl Bounds {
    /// Builds bounds from any two opposite corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: a.min(&b),
            max: a.max(&b),
        }
    }

    /// Folds a sequence of bounds into their union.
    ///
    /// Returns `None` for an empty iterator.
    #[must_use]
    pub fn union_all<I>(bounds: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        bounds.into_iter().reduce(|acc, b| acc.union(&b))
    }

    /// Returns the minimum corner.
    #[must_use]
    pub const fn min(&self) -> Point {
        self.min
    }

    /// Returns the maximum corner.
    #[must_use]
    pub const fn max(&self) -> Point {
        self.max
    }

    /// Left edge (`min.x`).
    #[must_use]
    pub const fn left(&self) -> i64 {
        self.min.x
    }

    /// Top edge (`min.y`).
    #[must_use]
    pub const fn top(&self) -> i64 {
        self.min.y
    }

    /// Horizontal extent.
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    #[must_use]
    pub const fn height(&self) -> i64 {
        self.max.y - self.min.y
    }

    /// Returns the union of two bounds.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(&other.min),
            max: self.max.max(&other.max),
        }
    }
}
