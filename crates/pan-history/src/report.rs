// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON report projection of a [`PannedArea`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracker_geom::Point;

use crate::extract::{PannedArea, RoiRecord};

/// One level of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    /// Left edge relative to the origin.
    pub left: i64,
    /// Top edge relative to the origin.
    pub top: i64,
    /// Width in native pixels.
    pub width: i64,
    /// Height in native pixels.
    pub height: i64,
    /// Accepted regions, processing order.
    pub rois: Vec<RoiRecord>,
}

/// Geometry of a reconstruction without pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanHistoryReport {
    /// Global left edge relative to the origin.
    pub left: i64,
    /// Global top edge relative to the origin.
    pub top: i64,
    /// Global width.
    pub width: i64,
    /// Global height.
    pub height: i64,
    /// Shared origin in native coordinates.
    pub origin: Point,
    /// Levels keyed by zoom.
    pub zoom_patches: BTreeMap<u32, LevelReport>,
}

/// Project `area` into its report form.
pub fn report(area: &PannedArea) -> PanHistoryReport {
    PanHistoryReport {
        left: area.bounds.left(),
        top: area.bounds.top(),
        width: area.bounds.width(),
        height: area.bounds.height(),
        origin: area.origin,
        zoom_patches: area
            .levels
            .iter()
            .map(|(zoom, level)| {
                (
                    *zoom,
                    LevelReport {
                        left: level.left(),
                        top: level.top(),
                        width: level.width(),
                        height: level.height(),
                        rois: level.rois.clone(),
                    },
                )
            })
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dedup::{AcceptedRegions, Roi};
    use crate::extract::layout;
    use crate::source::ImageMeta;
    use serde_json::json;
    use tracker_geom::PixelRect;

    #[test]
    fn wire_shape_has_no_scratch_fields() {
        let mut accepted = AcceptedRegions::new();
        accepted.insert(
            1,
            vec![Roi {
                rect: PixelRect::new(10, 20, 30, 60).unwrap(),
                epochms: 5.0,
            }],
        );
        let meta = ImageMeta {
            size_x: Some(100),
            size_y: Some(100),
            levels: 3,
            magnification: None,
        };
        let value = serde_json::to_value(report(&layout(&accepted, &meta).unwrap())).unwrap();
        assert_eq!(
            value,
            json!({
                "left": -10, "top": -20, "width": 20, "height": 40,
                "origin": {"x": 20, "y": 40},
                "zoomPatches": {
                    "1": {
                        "left": -10, "top": -20, "width": 20, "height": 40,
                        "rois": [{"left": -10, "top": -20, "width": 20, "height": 40, "zoom": 1, "epochms": 5.0}]
                    }
                }
            })
        );
    }
}
