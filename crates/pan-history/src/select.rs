// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event selection: pan events for one image whose zoom sits on a level.

use tracing::{debug, warn};
use tracker_activity::{Activity, ActivityEvent, ActivityLog, ActivityQuery, LogError, Sort, VisibleArea};
use tracker_app_core::prefs::ReconstructionPrefs;

/// Parameters for [`select_pan_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct PanQuery {
    /// Image whose pan events are wanted.
    pub image_id: String,
    /// Earliest `epochms`, inclusive.
    pub start_time: f64,
    /// Latest `epochms`, inclusive.
    pub end_time: f64,
    /// Zoom grid step; see [`zoom_level`].
    pub zoom_precision: f64,
    /// Query ordering (drives paging).
    pub sort: Sort,
    /// Maximum number of events fetched.
    pub limit: Option<usize>,
    /// Number of leading events skipped.
    pub offset: usize,
}

impl PanQuery {
    /// Every pan event for `image_id`, default precision, newest first.
    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            start_time: f64::MIN,
            end_time: f64::MAX,
            zoom_precision: ReconstructionPrefs::ZOOM_PRECISION,
            sort: Sort::default(),
            limit: None,
            offset: 0,
        }
    }

    /// Restrict to `[start, end]`.
    pub fn between(mut self, start: f64, end: f64) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Set the zoom grid step.
    pub fn precision(mut self, zoom_precision: f64) -> Self {
        self.zoom_precision = zoom_precision;
        self
    }

    fn to_activity_query(&self) -> ActivityQuery {
        ActivityQuery::new()
            .image(self.image_id.as_str())
            .activity(Activity::PAN)
            .between(self.start_time, self.end_time)
            .sorted(self.sort)
            .page(self.limit, self.offset)
    }
}

/// A pan event whose zoom was accepted onto an integer level.
#[derive(Debug, Clone, PartialEq)]
pub struct PanEvent {
    /// Browsing session.
    pub session: String,
    /// Per-session sequence id.
    pub sequence_id: u64,
    /// Browser timestamp.
    pub epochms: f64,
    /// Viewport corners on the source image.
    pub visible_area: VisibleArea,
    /// Raw viewer zoom.
    pub zoom: f64,
    /// Integer level the zoom rounds to.
    pub rounded_zoom: u32,
}

impl PanEvent {
    /// Project a logged event. `None` if it is not a pan, lacks a viewport or
    /// zoom, or its zoom is off the level grid.
    pub fn from_event(event: &ActivityEvent, zoom_precision: f64) -> Option<Self> {
        let Activity::Pan(view) = &event.activity else {
            return None;
        };
        let (visible_area, zoom) = (view.visible_area?, view.zoom?);
        let rounded_zoom = zoom_level(zoom, zoom_precision)?;
        Some(Self {
            session: event.session.clone(),
            sequence_id: event.sequence_id,
            epochms: event.epochms,
            visible_area,
            zoom,
            rounded_zoom,
        })
    }
}

/// Integer level for `zoom`, or `None` if the zoom is between levels.
///
/// The zoom is quantized to the `precision` grid and must land on the same
/// grid step as its nearest integer. With precision `0.001`, `3.0009` lands
/// on step 3001 and is rejected; with `0.01` it lands on step 300 and is
/// level 3. Negative levels are rejected.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    reason = "range checked before the cast; rounded grid steps compare exactly"
)]
pub fn zoom_level(zoom: f64, precision: f64) -> Option<u32> {
    if !zoom.is_finite() || precision.is_nan() || precision <= 0.0 {
        return None;
    }
    let nearest = zoom.round();
    if nearest < 0.0 || nearest > f64::from(u32::MAX) {
        return None;
    }
    ((zoom / precision).round() == (nearest / precision).round()).then_some(nearest as u32)
}

/// Fetch pan events for `query.image_id` and keep those on a zoom level.
///
/// An empty result means "nothing to reconstruct". Log failures propagate.
pub fn select_pan_events<L>(log: &L, query: &PanQuery) -> Result<Vec<PanEvent>, LogError>
where
    L: ActivityLog + ?Sized,
{
    let events = log.query(&query.to_activity_query())?;
    let fetched = events.len();
    let mut incomplete = 0usize;
    let selected: Vec<PanEvent> = events
        .iter()
        .filter(|event| {
            let complete = event
                .activity
                .view_state()
                .is_some_and(|v| v.visible_area.is_some() && v.zoom.is_some());
            if !complete {
                incomplete += 1;
            }
            complete
        })
        .filter_map(|event| PanEvent::from_event(event, query.zoom_precision))
        .collect();
    if incomplete > 0 {
        warn!(image_id = %query.image_id, incomplete, "skipped pan events without viewport or zoom");
    }
    debug!(
        image_id = %query.image_id,
        fetched,
        selected = selected.len(),
        "selected pan events"
    );
    Ok(selected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracker_activity::{Coord, LocalActivityLog, ViewState};

    fn area(x0: f64, y0: f64, x1: f64, y1: f64) -> VisibleArea {
        VisibleArea {
            tl: Coord { x: x0, y: y0 },
            tr: Coord { x: x1, y: y0 },
            bl: Coord { x: x0, y: y1 },
            br: Coord { x: x1, y: y1 },
        }
    }

    fn pan(seq: u64, ms: f64, image: &str, zoom: Option<f64>) -> ActivityEvent {
        ActivityEvent {
            session: "s".into(),
            sequence_id: seq,
            epochms: ms,
            activity: Activity::Pan(ViewState {
                current_image: Some(image.into()),
                visible_area: Some(area(0.0, 0.0, 10.0, 10.0)),
                zoom,
                ..ViewState::default()
            }),
        }
    }

    #[test]
    fn zoom_grid_example() {
        assert_eq!(zoom_level(3.0009, 0.001), None);
        assert_eq!(zoom_level(3.0009, 0.01), Some(3));
        assert_eq!(zoom_level(2.0, 0.001), Some(2));
        assert_eq!(zoom_level(2.5, 0.001), None);
        assert_eq!(zoom_level(1.9996, 0.001), Some(2));
    }

    #[test]
    fn zoom_level_rejects_bad_input() {
        assert_eq!(zoom_level(-1.0, 0.001), None);
        assert_eq!(zoom_level(f64::NAN, 0.001), None);
        assert_eq!(zoom_level(2.0, 0.0), None);
        assert_eq!(zoom_level(-0.0001, 0.001), Some(0));
    }

    #[test]
    fn selection_filters_image_kind_window_and_zoom() {
        let mut log = LocalActivityLog::new();
        log.append(pan(1, 100.0, "img", Some(2.0))).unwrap();
        log.append(pan(2, 200.0, "img", Some(2.4))).unwrap();
        log.append(pan(3, 300.0, "img", None)).unwrap();
        log.append(pan(4, 400.0, "other", Some(2.0))).unwrap();
        log.append(pan(5, 500.0, "img", Some(3.0))).unwrap();
        log.append(ActivityEvent {
            session: "s".into(),
            sequence_id: 6,
            epochms: 150.0,
            activity: Activity::Focus(ViewState {
                current_image: Some("img".into()),
                ..ViewState::default()
            }),
        })
        .unwrap();

        let picked = select_pan_events(&log, &PanQuery::new("img").between(0.0, 450.0)).unwrap();
        let ids: Vec<(u64, u32)> = picked.iter().map(|e| (e.sequence_id, e.rounded_zoom)).collect();
        assert_eq!(ids, vec![(1, 2)]);

        let all = select_pan_events(&log, &PanQuery::new("img")).unwrap();
        let ids: Vec<u64> = all.iter().map(|e| e.sequence_id).collect();
        assert_eq!(ids, vec![5, 1]);
    }

    #[test]
    fn empty_window_selects_nothing() {
        let mut log = LocalActivityLog::new();
        log.append(pan(1, 100.0, "img", Some(2.0))).unwrap();
        let picked = select_pan_events(&log, &PanQuery::new("img").between(50.0, 50.0)).unwrap();
        assert!(picked.is_empty());
    }
}
