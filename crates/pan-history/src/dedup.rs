// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-level greedy overlap filter.
//!
//! Regions are visited in order; a region is kept unless an already kept
//! region of the same level covers at least `threshold` of its area. Earlier
//! regions always win, so the processing order is part of the result and is
//! fixed explicitly by [`order_for_dedup`].

use std::collections::BTreeMap;

use tracing::debug;
use tracker_activity::VisibleArea;
use tracker_app_core::prefs::DedupOrder;
use tracker_geom::PixelRect;

use crate::select::PanEvent;

/// One viewport footprint in native pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Clamped, ordered pixel rectangle.
    pub rect: PixelRect,
    /// Timestamp of the pan event it came from.
    pub epochms: f64,
}

impl Roi {
    /// Footprint of a viewport from its top-left and bottom-right corners.
    pub fn from_visible_area(area: &VisibleArea, epochms: f64) -> Self {
        Self {
            rect: PixelRect::from_corners((area.tl.x, area.tl.y), (area.br.x, area.br.y)),
            epochms,
        }
    }
}

/// Accepted regions per zoom level, each in processing order.
pub type AcceptedRegions = BTreeMap<u32, Vec<Roi>>;

/// Sort `events` into the order the overlap filter should see them.
pub fn order_for_dedup(events: &mut [PanEvent], order: DedupOrder) {
    let by_key = |a: &PanEvent, b: &PanEvent| {
        (a.session.as_str(), a.sequence_id).cmp(&(b.session.as_str(), b.sequence_id))
    };
    match order {
        DedupOrder::OldestFirst => {
            events.sort_by(|a, b| a.epochms.total_cmp(&b.epochms).then_with(|| by_key(a, b)));
        }
        DedupOrder::NewestFirst => {
            events.sort_by(|a, b| b.epochms.total_cmp(&a.epochms).then_with(|| by_key(a, b)));
        }
        DedupOrder::AsQueried => {}
    }
}

/// Returns `true` if `candidate` adds enough new area next to `accepted`.
///
/// The largest single overlap with an accepted region is compared against
/// the candidate's area. Zero-area candidates are never accepted.
#[allow(clippy::cast_precision_loss, reason = "pixel areas are far below 2^52")]
pub fn accepts(accepted: &[Roi], candidate: &Roi, threshold: f64) -> bool {
    let area = candidate.rect.area();
    if area <= 0 {
        return false;
    }
    if accepted.is_empty() {
        return true;
    }
    let max_overlap = accepted
        .iter()
        .map(|roi| roi.rect.overlap_area(&candidate.rect))
        .max()
        .unwrap_or(0);
    (max_overlap as f64) / (area as f64) < threshold
}

/// Bucket `events` by level and run the overlap filter in the given order.
///
/// Levels with no accepted region are absent from the result.
pub fn downsample(events: &[PanEvent], threshold: f64) -> AcceptedRegions {
    let mut accepted = AcceptedRegions::new();
    let mut dropped = 0usize;
    for event in events {
        let candidate = Roi::from_visible_area(&event.visible_area, event.epochms);
        let kept = accepted.entry(event.rounded_zoom).or_default();
        if accepts(kept, &candidate, threshold) {
            kept.push(candidate);
        } else {
            dropped += 1;
        }
    }
    accepted.retain(|_, rois| !rois.is_empty());
    debug!(
        levels = accepted.len(),
        kept = accepted.values().map(Vec::len).sum::<usize>(),
        dropped,
        threshold,
        "deduplicated regions"
    );
    accepted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracker_activity::Coord;

    fn event(seq: u64, ms: f64, zoom: u32, tl: (f64, f64), br: (f64, f64)) -> PanEvent {
        PanEvent {
            session: "s".into(),
            sequence_id: seq,
            epochms: ms,
            visible_area: VisibleArea {
                tl: Coord { x: tl.0, y: tl.1 },
                tr: Coord { x: br.0, y: tl.1 },
                bl: Coord { x: tl.0, y: br.1 },
                br: Coord { x: br.0, y: br.1 },
            },
            zoom: f64::from(zoom),
            rounded_zoom: zoom,
        }
    }

    #[test]
    fn overlap_of_081_is_rejected_at_half() {
        let events = [
            event(1, 1.0, 2, (0.0, 0.0), (100.0, 100.0)),
            event(2, 2.0, 2, (10.0, 10.0), (110.0, 110.0)),
        ];
        let accepted = downsample(&events, 0.5);
        assert_eq!(accepted[&2].len(), 1);
        assert_eq!(accepted[&2][0].rect, PixelRect::new(0, 0, 100, 100).unwrap());

        // 0.81 < 0.9: both kept.
        assert_eq!(downsample(&events, 0.9)[&2].len(), 2);
    }

    #[test]
    fn levels_are_filtered_independently() {
        let events = [
            event(1, 1.0, 2, (0.0, 0.0), (100.0, 100.0)),
            event(2, 2.0, 3, (0.0, 0.0), (100.0, 100.0)),
            event(3, 3.0, 3, (0.0, 0.0), (100.0, 100.0)),
        ];
        let accepted = downsample(&events, 0.95);
        assert_eq!(accepted[&2].len(), 1);
        assert_eq!(accepted[&3].len(), 1);
    }

    #[test]
    fn negative_corners_clamp_and_zero_area_is_skipped() {
        let events = [
            event(1, 1.0, 1, (-50.0, -50.0), (-10.0, 20.0)),
            event(2, 2.0, 1, (-5.5, 3.9), (40.7, 30.2)),
        ];
        let accepted = downsample(&events, 0.95);
        // First footprint clamps to zero width and never enters the set.
        assert_eq!(accepted[&1].len(), 1);
        assert_eq!(accepted[&1][0].rect, PixelRect::new(0, 3, 40, 30).unwrap());
        assert!(downsample(&events[..1], 0.95).is_empty());
    }

    #[test]
    fn order_decides_which_duplicate_survives() {
        let mut events = vec![
            event(2, 20.0, 2, (0.0, 0.0), (100.0, 100.0)),
            event(1, 10.0, 2, (1.0, 1.0), (101.0, 101.0)),
        ];
        order_for_dedup(&mut events, DedupOrder::OldestFirst);
        let oldest = downsample(&events, 0.5);
        assert!((oldest[&2][0].epochms - 10.0).abs() < f64::EPSILON);

        order_for_dedup(&mut events, DedupOrder::NewestFirst);
        let newest = downsample(&events, 0.5);
        assert!((newest[&2][0].epochms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn higher_threshold_keeps_at_least_as_many_in_a_chain() {
        // Each region shifts right by 25 px from the first.
        let events: Vec<PanEvent> = (0..4u32)
            .map(|i| {
                let x = f64::from(i * 25);
                event(u64::from(i), f64::from(i), 2, (x, 0.0), (x + 100.0, 100.0))
            })
            .collect();
        let counts: Vec<usize> = [0.3, 0.5, 0.8, 0.99]
            .iter()
            .map(|t| downsample(&events, *t)[&2].len())
            .collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
        assert_eq!(counts.last(), Some(&4));
    }
}
