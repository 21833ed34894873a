// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Write-time validation of raw activity objects.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::event::{Activity, ActivityEvent};

/// A raw activity object failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The entry was not a JSON object.
    #[error("Activity entries must be objects")]
    NotAnObject,
    /// `session` missing, empty or not a string.
    #[error("Activity session must be a string")]
    Session,
    /// `sequenceId` missing, fractional or negative.
    #[error("Activity sequenceId must be a non-negative integer")]
    SequenceId,
    /// `epochms` missing, not a number or not finite.
    #[error("Activity epochms must be a number")]
    Epochms,
    /// `activity` missing, empty or not a string.
    #[error("Activity activity must be a string")]
    Kind,
}

pub(crate) fn parse_event(mut fields: Map<String, Value>) -> Result<ActivityEvent, ValidationError> {
    let session = match fields.remove("session") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err(ValidationError::Session),
    };
    let sequence_id = fields
        .remove("sequenceId")
        .and_then(|v| v.as_u64())
        .ok_or(ValidationError::SequenceId)?;
    let epochms = fields
        .remove("epochms")
        .and_then(|v| v.as_f64())
        .filter(|ms| ms.is_finite())
        .ok_or(ValidationError::Epochms)?;
    let kind = match fields.remove("activity") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err(ValidationError::Kind),
    };
    Ok(ActivityEvent {
        session,
        sequence_id,
        epochms,
        activity: Activity::from_parts(&kind, fields),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(value: Value) -> Result<ActivityEvent, ValidationError> {
        ActivityEvent::from_value(value)
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(check(json!([1, 2])), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn rejects_missing_or_empty_session() {
        let base = json!({"sequenceId": 1, "epochms": 1, "activity": "pan"});
        assert_eq!(check(base), Err(ValidationError::Session));
        let empty = json!({"session": "", "sequenceId": 1, "epochms": 1, "activity": "pan"});
        assert_eq!(check(empty), Err(ValidationError::Session));
        let number = json!({"session": 4, "sequenceId": 1, "epochms": 1, "activity": "pan"});
        assert_eq!(check(number), Err(ValidationError::Session));
    }

    #[test]
    fn rejects_negative_or_fractional_sequence_ids() {
        let negative = json!({"session": "s", "sequenceId": -1, "epochms": 1, "activity": "pan"});
        assert_eq!(check(negative), Err(ValidationError::SequenceId));
        let fractional = json!({"session": "s", "sequenceId": 1.5, "epochms": 1, "activity": "pan"});
        assert_eq!(check(fractional), Err(ValidationError::SequenceId));
    }

    #[test]
    fn rejects_non_numeric_epochms() {
        let text = json!({"session": "s", "sequenceId": 1, "epochms": "now", "activity": "pan"});
        assert_eq!(check(text), Err(ValidationError::Epochms));
    }

    #[test]
    fn rejects_missing_activity_tag() {
        let missing = json!({"session": "s", "sequenceId": 1, "epochms": 1});
        assert_eq!(check(missing), Err(ValidationError::Kind));
    }

    #[test]
    fn mistyped_kind_fields_still_validate() {
        let bad_zoom = json!({
            "session": "s", "sequenceId": 1, "epochms": 1,
            "activity": "pan", "zoom": "close"
        });
        let event = check(bad_zoom).unwrap();
        assert_eq!(event.activity.kind(), "pan");
        assert!(event.activity.view_state().is_none());
    }

    #[test]
    fn integer_epochms_is_widened() {
        let ok = check(json!({"session": "s", "sequenceId": 0, "epochms": 12, "activity": "blur"}));
        assert!(matches!(ok, Ok(ev) if (ev.epochms - 12.0).abs() < f64::EPSILON));
    }
}
