// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pan event construction for tests.
//!
//! # Example
//!
//! ```
//! use tracker_dry_tests::PanBuilder;
//! use tracker_activity::{ActivityLog, LocalActivityLog};
//!
//! let mut log = LocalActivityLog::new();
//! let event = PanBuilder::new("slide")
//!     .seq(1)
//!     .at(1_000.0)
//!     .zoom(2.0)
//!     .viewport((0.0, 0.0), (100.0, 100.0))
//!     .build();
//! log.append(event).unwrap();
//! assert_eq!(log.len(), 1);
//! ```

use serde_json::{Map, Value};
use tracker_activity::{Activity, ActivityEvent, Coord, ViewState, VisibleArea};

/// Builder for `pan` activity events.
///
/// All methods take `self` by value and return `Self` for chaining.
#[derive(Debug, Clone)]
pub struct PanBuilder {
    image: String,
    session: String,
    sequence_id: u64,
    epochms: f64,
    zoom: Option<f64>,
    area: Option<VisibleArea>,
}

impl PanBuilder {
    /// Pan on `image` in session `"session"`, sequence 0, at time 0, with no
    /// viewport or zoom yet.
    pub fn new(image: &str) -> Self {
        Self {
            image: image.to_owned(),
            session: "session".to_owned(),
            sequence_id: 0,
            epochms: 0.0,
            zoom: None,
            area: None,
        }
    }

    /// Set the browsing session.
    pub fn session(mut self, session: &str) -> Self {
        self.session = session.to_owned();
        self
    }

    /// Set the sequence id.
    pub fn seq(mut self, sequence_id: u64) -> Self {
        self.sequence_id = sequence_id;
        self
    }

    /// Set the timestamp.
    pub fn at(mut self, epochms: f64) -> Self {
        self.epochms = epochms;
        self
    }

    /// Set the viewer zoom.
    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Set an axis-aligned viewport from its top-left and bottom-right.
    pub fn viewport(mut self, tl: (f64, f64), br: (f64, f64)) -> Self {
        self.area = Some(VisibleArea {
            tl: Coord { x: tl.0, y: tl.1 },
            tr: Coord { x: br.0, y: tl.1 },
            bl: Coord { x: tl.0, y: br.1 },
            br: Coord { x: br.0, y: br.1 },
        });
        self
    }

    /// Finish as a typed event.
    pub fn build(self) -> ActivityEvent {
        ActivityEvent {
            session: self.session,
            sequence_id: self.sequence_id,
            epochms: self.epochms,
            activity: Activity::Pan(ViewState {
                current_image: Some(self.image),
                visible_area: self.area,
                zoom: self.zoom,
                rotation: Some(0.0),
                ..ViewState::default()
            }),
        }
    }

    /// Finish as the flat JSON object a browser would send.
    pub fn to_json(self) -> Value {
        Value::Object(Map::from(self.build()))
    }
}
