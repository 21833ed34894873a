// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Activity event model.
//!
//! Wire form is a flat JSON object: the common envelope (`session`,
//! `sequenceId`, `epochms`, `activity`) plus fields specific to the activity
//! kind. In memory the kind-specific fields live in the [`Activity`] sum type.
//!
//! Only the envelope is validated. Kind fields are decoded into a typed view
//! when they fit; fields the view does not name are kept in its `extra` map,
//! and a payload that does not fit at all is kept as [`Activity::Other`]
//! under its original tag. Either way the stored object is the one the
//! client sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::validate::{parse_event, ValidationError};

/// One logged browser activity.
///
/// `(session, sequence_id)` identifies an event; the log never stores two
/// events with the same pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ActivityEvent {
    /// Browsing-session identifier.
    pub session: String,
    /// Per-session, monotonically increasing id.
    pub sequence_id: u64,
    /// Browser wall-clock time in milliseconds.
    pub epochms: f64,
    /// Kind-specific payload.
    pub activity: Activity,
}

impl ActivityEvent {
    /// Dedup key for this event.
    pub fn key(&self) -> (&str, u64) {
        (self.session.as_str(), self.sequence_id)
    }

    /// The image shown when this event was recorded, if the kind carries it.
    pub fn current_image(&self) -> Option<&str> {
        self.activity
            .view_state()
            .and_then(|v| v.current_image.as_deref())
    }

    /// Validates and converts one raw JSON object.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(fields) => parse_event(fields),
            _ => Err(ValidationError::NotAnObject),
        }
    }
}

impl TryFrom<Map<String, Value>> for ActivityEvent {
    type Error = ValidationError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        parse_event(fields)
    }
}

impl From<ActivityEvent> for Map<String, Value> {
    fn from(event: ActivityEvent) -> Self {
        let mut out = match event.activity.payload() {
            Some(Value::Object(fields)) => fields,
            _ => Self::new(),
        };
        out.insert("session".into(), Value::String(event.session));
        out.insert("sequenceId".into(), Value::from(event.sequence_id));
        out.insert("epochms".into(), Value::from(event.epochms));
        out.insert("activity".into(), Value::String(event.activity.kind().to_owned()));
        out
    }
}

/// Kind-specific activity payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// Periodic viewer-state snapshot.
    Session(ViewState),
    /// An image was opened in the viewer.
    ImageOpened(ViewState),
    /// The viewport moved or zoomed.
    Pan(ViewState),
    /// The tab gained focus.
    Focus(ViewState),
    /// The tab lost focus.
    Blur(ViewState),
    /// Document visibility changed.
    VisibilityState(ViewState),
    /// Pointer moved.
    MouseMove(PointerInput),
    /// Pointer button pressed.
    MouseDown(PointerInput),
    /// Pointer button released.
    MouseUp(PointerInput),
    /// Pointer click.
    Click(PointerInput),
    /// Key pressed.
    KeyDown(KeyInput),
    /// Key released.
    KeyUp(KeyInput),
    /// Experiment state change.
    Experiment(ExperimentInput),
    /// Any activity kind this crate does not model.
    Other {
        /// The raw `activity` tag.
        kind: String,
        /// All remaining fields, unchanged.
        fields: Map<String, Value>,
    },
}

impl Activity {
    /// Tag for pan events.
    pub const PAN: &'static str = "pan";

    /// The wire tag for this activity.
    pub fn kind(&self) -> &str {
        match self {
            Self::Session(_) => "session",
            Self::ImageOpened(_) => "imageOpened",
            Self::Pan(_) => Self::PAN,
            Self::Focus(_) => "focus",
            Self::Blur(_) => "blur",
            Self::VisibilityState(_) => "visibilityState",
            Self::MouseMove(_) => "mousemove",
            Self::MouseDown(_) => "mousedown",
            Self::MouseUp(_) => "mouseup",
            Self::Click(_) => "click",
            Self::KeyDown(_) => "keydown",
            Self::KeyUp(_) => "keyup",
            Self::Experiment(_) => "experiment",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Viewer state carried by session-style activities.
    pub fn view_state(&self) -> Option<&ViewState> {
        match self {
            Self::Session(v)
            | Self::ImageOpened(v)
            | Self::Pan(v)
            | Self::Focus(v)
            | Self::Blur(v)
            | Self::VisibilityState(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn from_parts(kind: &str, fields: Map<String, Value>) -> Self {
        let payload = Value::Object(fields);
        let typed = match kind {
            "session" => decode(&payload).map(Self::Session),
            "imageOpened" => decode(&payload).map(Self::ImageOpened),
            "pan" => decode(&payload).map(Self::Pan),
            "focus" => decode(&payload).map(Self::Focus),
            "blur" => decode(&payload).map(Self::Blur),
            "visibilityState" => decode(&payload).map(Self::VisibilityState),
            "mousemove" => decode(&payload).map(Self::MouseMove),
            "mousedown" => decode(&payload).map(Self::MouseDown),
            "mouseup" => decode(&payload).map(Self::MouseUp),
            "click" => decode(&payload).map(Self::Click),
            "keydown" => decode(&payload).map(Self::KeyDown),
            "keyup" => decode(&payload).map(Self::KeyUp),
            "experiment" => decode(&payload).map(Self::Experiment),
            _ => None,
        };
        typed.unwrap_or_else(|| Self::Other {
            kind: kind.to_owned(),
            fields: match payload {
                Value::Object(fields) => fields,
                _ => Map::new(),
            },
        })
    }

    fn payload(&self) -> Option<Value> {
        match self {
            Self::Session(v)
            | Self::ImageOpened(v)
            | Self::Pan(v)
            | Self::Focus(v)
            | Self::Blur(v)
            | Self::VisibilityState(v) => serde_json::to_value(v).ok(),
            Self::MouseMove(p) | Self::MouseDown(p) | Self::MouseUp(p) | Self::Click(p) => {
                serde_json::to_value(p).ok()
            }
            Self::KeyDown(k) | Self::KeyUp(k) => serde_json::to_value(k).ok(),
            Self::Experiment(e) => serde_json::to_value(e).ok(),
            Self::Other { fields, .. } => Some(Value::Object(fields.clone())),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &Value) -> Option<T> {
    T::deserialize(payload)
        .map_err(|err| debug!(%err, "kind fields kept untyped"))
        .ok()
}

/// Image-space coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// Corners of the viewport in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleArea {
    /// Top-left corner.
    pub tl: Coord,
    /// Top-right corner.
    pub tr: Coord,
    /// Bottom-left corner.
    pub bl: Coord,
    /// Bottom-right corner.
    pub br: Coord,
}

/// Placement of the viewer element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagePosition {
    /// Element width in CSS pixels.
    pub width: f64,
    /// Element height in CSS pixels.
    pub height: f64,
    /// Page offset of the top edge.
    pub top: f64,
    /// Page offset of the left edge.
    pub left: f64,
}

/// Browser screen dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

/// Viewer state attached to session-style activities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Id of the displayed image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_image: Option<String>,
    /// Authenticated user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Whether the tab had focus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_focus: Option<bool>,
    /// Document visibility (`visible`, `hidden`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_state: Option<String>,
    /// Viewport corners on the source image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_area: Option<VisibleArea>,
    /// Viewer element placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_position: Option<ImagePosition>,
    /// Viewer rotation in radians.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Viewer zoom level (fractional while animating).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    /// Screen dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_size: Option<ScreenSize>,
    /// Fields this view does not name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifiers {
    /// Alt held.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_key: Option<bool>,
    /// Control held.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_key: Option<bool>,
    /// Meta held.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_key: Option<bool>,
    /// Shift held.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_key: Option<bool>,
}

/// Pointer input payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerInput {
    /// CSS selector of the event target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Button that changed state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<i64>,
    /// Bitmask of held buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<i64>,
    /// Named held buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons_down: Option<Vec<String>>,
    /// Position relative to the browser window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mouse: Option<Coord>,
    /// Position relative to the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Coord>,
    /// Position relative to the target element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Coord>,
    /// Position in source-image pixels when over the viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Coord>,
    /// Modifier keys.
    #[serde(flatten)]
    pub modifiers: Modifiers,
    /// Fields this view does not name (`which`, `charCode`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keyboard input payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    /// CSS selector of the focused element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Logical key name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Legacy key code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<i64>,
    /// Modifier keys.
    #[serde(flatten)]
    pub modifiers: Modifiers,
    /// Fields this view does not name (`which`, `charCode`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Experiment lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentState {
    /// Experiment started.
    Start,
    /// Experiment paused.
    Pause,
    /// Experiment stopped.
    Stop,
    /// Advanced to the next task.
    Next,
}

/// Experiment payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentInput {
    /// Lifecycle step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_state: Option<ExperimentState>,
    /// Experiment identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    /// Fields this view does not name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
