// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]
//! Filesystem sink behavior.

use tracker_cas::{blob_hash, ArtifactSink, DirArtifactSink, SinkError};

#[test]
fn writes_nested_folders_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirArtifactSink::new(dir.path().join("artifacts"));

    let receipt = sink.store("slide-7/run", "level_3.png", b"first").unwrap();
    let path = dir.path().join("artifacts").join("slide-7").join("run").join("level_3.png");
    assert_eq!(std::fs::read(&path).unwrap(), b"first");
    assert_eq!(receipt.id, blob_hash(b"first"));
    assert_eq!(sink.path_of("slide-7/run", "level_3.png"), path);

    let again = sink.store("slide-7/run", "level_3.png", b"second!").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"second!");
    assert_eq!(again.byte_length, 7);
}

#[test]
fn refuses_parent_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirArtifactSink::new(dir.path());
    let err = sink.store("../outside", "x.png", b"x").unwrap_err();
    assert!(matches!(err, SinkError::InvalidName(name) if name == "../outside"));
    assert!(!dir.path().parent().unwrap().join("outside").exists());
}

#[test]
fn receipt_serializes_camel_case() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirArtifactSink::new(dir.path());
    let receipt = sink.store("img", "composite.json", b"{}").unwrap();
    let value = serde_json::to_value(&receipt).unwrap();
    assert_eq!(value["byteLength"], 2);
    assert_eq!(value["filename"], "composite.json");
    assert_eq!(value["id"], blob_hash(b"{}").to_hex());
}
