// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![deny(
    clippy::all,
    clippy::pedantic,
    rust_2018_idioms,
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![doc = r"Pixel-space geometry for pan-history reconstruction.

This crate provides:
- Integer source-pixel rectangles (`PixelRect`) with overlap arithmetic.
- Signed points (`Point`) for coordinates relative to a shared origin.
- Axis-aligned bounds (`Bounds`) built as explicit folds over points.

Design notes:
- Source rectangles are unsigned and clamped; anything relative to an origin
  is signed (`i64`) because it can fall left of or above the origin.
- Overlap is exclusive on edges: rectangles that merely touch share no area.
- Everything is `Copy` and allocation-free.
"]

/// Foundational geometric types.
pub mod types;

pub use types::bounds::Bounds;
pub use types::point::Point;
pub use types::rect::PixelRect;
