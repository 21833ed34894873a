// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]
//! Journal persistence and batch logging through the public API.

use serde_json::json;
use tracker_activity::{
    log_activities, Activity, ActivityLog, ActivityQuery, Appended, JournalActivityLog,
    LocalActivityLog, LogError, Sort, ValidationError,
};

fn pan_json(session: &str, seq: u64, ms: f64, image: &str, zoom: f64) -> serde_json::Value {
    json!({
        "session": session,
        "sequenceId": seq,
        "epochms": ms,
        "activity": "pan",
        "currentImage": image,
        "zoom": zoom,
        "rotation": 0.0,
        "visibleArea": {
            "tl": {"x": 0.0, "y": 0.0},
            "tr": {"x": 100.0, "y": 0.0},
            "bl": {"x": 0.0, "y": 100.0},
            "br": {"x": 100.0, "y": 100.0}
        }
    })
}

#[test]
fn batch_returns_sorted_ids_per_session() {
    let mut log = LocalActivityLog::new();
    let saved = log_activities(
        &mut log,
        vec![
            pan_json("s2", 4, 10.0, "img", 3.0),
            pan_json("s1", 9, 11.0, "img", 3.0),
            pan_json("s1", 2, 12.0, "img", 3.0),
            pan_json("s1", 2, 12.0, "img", 3.0),
        ],
    )
    .unwrap();
    assert_eq!(saved.get("s1"), Some(&vec![2, 9]));
    assert_eq!(saved.get("s2"), Some(&vec![4]));
    assert_eq!(log.len(), 3);
}

#[test]
fn resubmitted_batch_reports_the_same_ids_without_growing() {
    let mut log = LocalActivityLog::new();
    let batch = vec![pan_json("s", 1, 1.0, "img", 2.0), pan_json("s", 2, 2.0, "img", 2.0)];
    let first = log_activities(&mut log, batch.clone()).unwrap();
    let second = log_activities(&mut log, batch).unwrap();
    assert_eq!(first, second);
    assert_eq!(log.len(), 2);
}

#[test]
fn invalid_entry_rejects_the_whole_batch() {
    let mut log = LocalActivityLog::new();
    let err = log_activities(
        &mut log,
        vec![
            pan_json("s", 1, 1.0, "img", 2.0),
            json!({"session": "s", "sequenceId": 2, "epochms": "later", "activity": "pan"}),
        ],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LogError::Invalid {
            index: 1,
            source: ValidationError::Epochms
        }
    ));
    assert!(log.is_empty());
}

#[test]
fn client_shaped_inputs_do_not_poison_the_batch() {
    let mut log = LocalActivityLog::new();
    let click = json!({
        "session": "s", "sequenceId": 2, "epochms": 2.0, "activity": "click",
        "target": "#viewer", "button": 0, "buttons": 1, "which": 1,
        "mouse": {}, "page": {}, "offset": {}, "altKey": false
    });
    let saved = log_activities(&mut log, vec![pan_json("s", 1, 1.0, "img", 2.0), click.clone()]).unwrap();
    assert_eq!(saved.get("s"), Some(&vec![1, 2]));

    let stored = log.query(&ActivityQuery::new().activity("click")).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(serde_json::to_value(&stored[0]).unwrap(), click);
}

#[test]
fn journal_replays_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("activity.jsonl");

    {
        let mut log = JournalActivityLog::open(&path).unwrap();
        log_activities(
            &mut log,
            vec![
                pan_json("s", 1, 100.0, "img", 2.0),
                pan_json("s", 2, 200.0, "img", 3.0),
                json!({"session": "s", "sequenceId": 3, "epochms": 300.0, "activity": "wheel", "deltaY": -3}),
            ],
        )
        .unwrap();
        assert_eq!(log.len(), 3);
    }

    let mut reopened = JournalActivityLog::open(&path).unwrap();
    assert_eq!(reopened.len(), 3);
    let pans = reopened
        .query(&ActivityQuery::new().image("img").activity(Activity::PAN).sorted(Sort::OLDEST_FIRST))
        .unwrap();
    let ids: Vec<u64> = pans.iter().map(|e| e.sequence_id).collect();
    assert_eq!(ids, vec![1, 2]);
    let zoom = pans[1].activity.view_state().and_then(|v| v.zoom);
    assert_eq!(zoom, Some(3.0));

    // Unknown kinds keep their tag and fields across the round trip.
    let other = reopened.query(&ActivityQuery::new().activity("wheel")).unwrap();
    assert_eq!(other.len(), 1);
    assert!(matches!(
        &other[0].activity,
        Activity::Other { kind, fields } if kind == "wheel" && fields.get("deltaY") == Some(&json!(-3))
    ));

    // A duplicate after reopen is still a no-op and is not journaled again.
    let dup = tracker_activity::ActivityEvent::from_value(pan_json("s", 1, 999.0, "x", 9.0)).unwrap();
    assert_eq!(reopened.append(dup).unwrap(), Appended::AlreadyPresent);
    drop(reopened);
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn corrupt_journal_line_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.jsonl");
    let good = serde_json::to_string(&pan_json("s", 1, 1.0, "img", 1.0)).unwrap();
    std::fs::write(&path, format!("{good}\n{{not json\n")).unwrap();

    let err = JournalActivityLog::open(&path).unwrap_err();
    assert!(matches!(err, LogError::Corrupt { line: 2, .. }));
}

#[test]
fn torn_final_line_is_dropped_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.jsonl");
    let good = serde_json::to_string(&pan_json("s", 1, 1.0, "img", 1.0)).unwrap();
    std::fs::write(&path, format!("{good}\n{{\"session\":\"s\",\"seq")).unwrap();

    let mut log = JournalActivityLog::open(&path).unwrap();
    assert_eq!(log.len(), 1);
    log_activities(&mut log, vec![pan_json("s", 2, 2.0, "img", 1.0)]).unwrap();
    drop(log);

    let reopened = JournalActivityLog::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
}

#[test]
fn unterminated_complete_line_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.jsonl");
    let good = serde_json::to_string(&pan_json("s", 1, 1.0, "img", 1.0)).unwrap();
    std::fs::write(&path, &good).unwrap();

    let mut log = JournalActivityLog::open(&path).unwrap();
    log_activities(&mut log, vec![pan_json("s", 2, 2.0, "img", 1.0)]).unwrap();
    drop(log);

    assert_eq!(JournalActivityLog::open(&path).unwrap().len(), 2);
}
