// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]
//! End-to-end reconstruction against the synthetic pyramid and recording sink.

use pan_history::assemble::DESCRIPTOR_FILENAME;
use pan_history::{
    reconstruct_composite, reconstruct_raster, reconstruct_report, CompositeDescriptor, PanHistoryError,
    ReconstructionRequest, Selection,
};
use proptest::prelude::*;
use tracker_activity::{ActivityLog, LocalActivityLog, Sort};
use tracker_app_core::prefs::ReconstructionPrefs;
use tracker_dry_tests::{PanBuilder, RecordingSink, SyntheticPyramid};
use tracker_geom::Point;

const SLIDE: &str = "slide";

fn pyramid() -> SyntheticPyramid {
    // Five levels: zoom 2 is upscale 4 (5x), zoom 3 is upscale 2 (10x).
    SyntheticPyramid::new().with_pyramid(SLIDE, 10_000, 10_000, 5)
}

fn two_level_log() -> LocalActivityLog {
    let mut log = LocalActivityLog::new();
    log.append(
        PanBuilder::new(SLIDE)
            .seq(1)
            .at(1_000.0)
            .zoom(2.0)
            .viewport((0.0, 0.0), (400.0, 400.0))
            .build(),
    )
    .unwrap();
    log.append(
        PanBuilder::new(SLIDE)
            .seq(2)
            .at(2_000.0)
            .zoom(3.0)
            .viewport((600.0, 0.0), (800.0, 200.0))
            .build(),
    )
    .unwrap();
    log
}

#[test]
fn report_has_union_bounds_and_origin_relative_levels() {
    let report = reconstruct_report(&two_level_log(), &pyramid(), &ReconstructionRequest::new(SLIDE))
        .unwrap()
        .unwrap();

    assert_eq!(report.origin, Point::new(200, 200));
    assert_eq!((report.left, report.top, report.width, report.height), (-200, -200, 800, 400));

    let coarse = &report.zoom_patches[&2];
    assert_eq!((coarse.left, coarse.top, coarse.width, coarse.height), (-200, -200, 400, 400));
    let fine = &report.zoom_patches[&3];
    assert_eq!((fine.left, fine.top, fine.width, fine.height), (400, -200, 200, 200));
    assert_eq!(fine.rois.len(), 1);
    assert!((fine.rois[0].epochms - 2_000.0).abs() < f64::EPSILON);
}

#[test]
fn report_fetches_no_pixels() {
    let source = pyramid();
    reconstruct_report(&two_level_log(), &source, &ReconstructionRequest::new(SLIDE)).unwrap();
    assert!(source.region_calls().is_empty());
}

#[test]
fn composite_writes_mosaics_then_descriptor() {
    let log = two_level_log();
    let source = pyramid();
    let mut sink = RecordingSink::new();
    let request = ReconstructionRequest::new(SLIDE);

    let composite = reconstruct_composite(&log, &source, &mut sink, &request, "out/slide")
        .unwrap()
        .unwrap();

    assert_eq!(sink.filenames(), vec!["level_2.png", "level_3.png", DESCRIPTOR_FILENAME]);
    assert!(sink.writes().iter().all(|w| w.folder == "out/slide"));

    // Regions are fetched at each level's effective magnification.
    let mags: Vec<f64> = source.region_calls().iter().map(|c| c.magnification).collect();
    assert_eq!(mags, vec![5.0, 10.0]);

    let sources = &composite.descriptor.sources;
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].path, "level_2.png");
    assert_eq!((sources[0].position.x, sources[0].position.y, sources[0].position.scale), (0, 0, 4));
    assert_eq!(sources[1].path, "level_3.png");
    assert_eq!((sources[1].position.x, sources[1].position.y, sources[1].position.scale), (600, 0, 2));
    assert_eq!(sources[0].position.scale, sources[1].position.scale * 2);
    assert!(sources.iter().all(|s| s.z == 0));

    // The stored descriptor matches the returned one.
    let stored: CompositeDescriptor = serde_json::from_slice(&sink.bytes_of(DESCRIPTOR_FILENAME).unwrap()).unwrap();
    assert_eq!(stored, composite.descriptor);

    // Geometry agrees with the report-only path.
    let report = reconstruct_report(&log, &source, &request).unwrap().unwrap();
    assert_eq!(composite.report, report);
}

#[test]
fn selection_outlives_later_appends() {
    let mut log = two_level_log();
    let source = pyramid();
    let request = ReconstructionRequest::new(SLIDE);
    let selection = Selection::new(&log, &request).unwrap();
    assert_eq!(selection.events().len(), 2);

    log.append(
        PanBuilder::new(SLIDE)
            .seq(3)
            .at(3_000.0)
            .zoom(3.0)
            .viewport((5_000.0, 5_000.0), (5_200.0, 5_200.0))
            .build(),
    )
    .unwrap();

    let from_selection = selection.report(&source).unwrap();
    let before = reconstruct_report(&two_level_log(), &source, &request).unwrap();
    assert_eq!(from_selection, before);

    let mut sink = RecordingSink::new();
    let composite = selection.composite(&source, &mut sink, "out/slide").unwrap().unwrap();
    assert_eq!(Some(composite.report), before);
    assert_eq!(source.region_calls().len(), 2);
}

#[test]
fn mosaics_decode_at_level_resolution() {
    let mut sink = RecordingSink::new();
    reconstruct_composite(&two_level_log(), &pyramid(), &mut sink, &ReconstructionRequest::new(SLIDE), "out")
        .unwrap()
        .unwrap();

    let coarse = image::load_from_memory(&sink.bytes_of("level_2.png").unwrap()).unwrap().to_rgba8();
    assert_eq!(coarse.dimensions(), (100, 100));
    assert_eq!(coarse.get_pixel(50, 50), &SyntheticPyramid::shade(5.0));

    let fine = image::load_from_memory(&sink.bytes_of("level_3.png").unwrap()).unwrap().to_rgba8();
    assert_eq!(fine.dimensions(), (100, 100));
    assert_eq!(fine.get_pixel(50, 50), &SyntheticPyramid::shade(10.0));
}

#[test]
fn empty_window_is_none_and_touches_nothing() {
    let source = pyramid();
    let mut sink = RecordingSink::new();
    let request = ReconstructionRequest::new(SLIDE).between(5_000.0, 6_000.0);

    let out = reconstruct_composite(&two_level_log(), &source, &mut sink, &request, "out").unwrap();
    assert!(out.is_none());
    assert!(source.region_calls().is_empty());
    assert_eq!(sink.attempts(), 0);
}

#[test]
fn unknown_image_is_none() {
    let mut log = LocalActivityLog::new();
    log.append(
        PanBuilder::new("ghost")
            .seq(1)
            .zoom(2.0)
            .viewport((0.0, 0.0), (10.0, 10.0))
            .build(),
    )
    .unwrap();

    let out = reconstruct_report(&log, &pyramid(), &ReconstructionRequest::new("ghost")).unwrap();
    assert!(out.is_none());
}

#[test]
fn levels_outside_the_pyramid_are_dropped() {
    let mut log = two_level_log();
    log.append(
        PanBuilder::new(SLIDE)
            .seq(3)
            .at(3_000.0)
            .zoom(9.0)
            .viewport((0.0, 0.0), (10.0, 10.0))
            .build(),
    )
    .unwrap();

    let report = reconstruct_report(&log, &pyramid(), &ReconstructionRequest::new(SLIDE))
        .unwrap()
        .unwrap();
    assert_eq!(report.zoom_patches.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn fractional_zoom_within_precision_counts() {
    let mut log = LocalActivityLog::new();
    for (seq, zoom, x) in [(1, 2.0004, 1_000.0), (2, 2.3, 2_000.0)] {
        log.append(
            PanBuilder::new(SLIDE)
                .seq(seq)
                .zoom(zoom)
                .viewport((x, 0.0), (x + 100.0, 100.0))
                .build(),
        )
        .unwrap();
    }

    let report = reconstruct_report(&log, &pyramid(), &ReconstructionRequest::new(SLIDE))
        .unwrap()
        .unwrap();
    assert_eq!(report.zoom_patches.len(), 1);
    assert_eq!(report.zoom_patches[&2].rois.len(), 1);
}

#[test]
fn repeated_viewports_are_fetched_once() {
    let mut log = LocalActivityLog::new();
    for seq in 1..=4u32 {
        log.append(
            PanBuilder::new(SLIDE)
                .seq(u64::from(seq))
                .at(f64::from(seq))
                .zoom(3.0)
                .viewport((100.0, 100.0), (300.0, 300.0))
                .build(),
        )
        .unwrap();
    }
    let source = pyramid();
    let mut sink = RecordingSink::new();

    reconstruct_composite(&log, &source, &mut sink, &ReconstructionRequest::new(SLIDE), "out")
        .unwrap()
        .unwrap();
    assert_eq!(source.region_calls().len(), 1);
}

#[test]
fn paging_limits_the_events_considered() {
    let request = ReconstructionRequest::new(SLIDE).paged(Sort::OLDEST_FIRST, Some(1), 0);
    let report = reconstruct_report(&two_level_log(), &pyramid(), &request).unwrap().unwrap();
    assert_eq!(report.zoom_patches.keys().copied().collect::<Vec<_>>(), vec![2]);

    let request = ReconstructionRequest::new(SLIDE).paged(Sort::OLDEST_FIRST, Some(1), 1);
    let report = reconstruct_report(&two_level_log(), &pyramid(), &request).unwrap().unwrap();
    assert_eq!(report.zoom_patches.keys().copied().collect::<Vec<_>>(), vec![3]);
}

#[test]
fn invalid_prefs_are_rejected_before_querying() {
    let prefs = ReconstructionPrefs {
        zoom_precision: 0.0,
        ..ReconstructionPrefs::default()
    };
    let request = ReconstructionRequest::new(SLIDE).with_prefs(prefs);
    let err = reconstruct_report(&two_level_log(), &pyramid(), &request).unwrap_err();
    assert!(matches!(err, PanHistoryError::Prefs(_)));
}

#[test]
fn fetch_failure_aborts_without_writing() {
    let source = pyramid();
    source.set_fail_on_region(true);
    let mut sink = RecordingSink::new();

    let err = reconstruct_composite(&two_level_log(), &source, &mut sink, &ReconstructionRequest::new(SLIDE), "out")
        .unwrap_err();
    assert!(matches!(err, PanHistoryError::Source(_)));
    assert_eq!(source.region_calls().len(), 1);
    assert_eq!(sink.attempts(), 0);
}

#[test]
fn sink_failure_never_leaves_a_descriptor() {
    let mut sink = RecordingSink::new();
    sink.fail_after(1);

    let err = reconstruct_composite(&two_level_log(), &pyramid(), &mut sink, &ReconstructionRequest::new(SLIDE), "out")
        .unwrap_err();
    assert!(matches!(err, PanHistoryError::Sink(_)));
    assert_eq!(sink.filenames(), vec!["level_2.png"]);
    assert!(sink.bytes_of(DESCRIPTOR_FILENAME).is_none());
}

#[test]
fn raster_defaults_to_the_coarsest_scale() {
    let raster = reconstruct_raster(&two_level_log(), &pyramid(), &ReconstructionRequest::new(SLIDE), None)
        .unwrap()
        .unwrap();

    // 800x400 native pixels at 4 native pixels per output pixel.
    assert_eq!(raster.dimensions(), (200, 100));
    assert_eq!(raster.get_pixel(50, 50), &SyntheticPyramid::shade(5.0));
    // Gap between the two levels stays transparent.
    assert_eq!(raster.get_pixel(125, 10)[3], 0);
    // Fine level lands at (400 - -200) / 4 = 150 and shrinks to 50x50.
    let fine = raster.get_pixel(175, 25);
    let want = SyntheticPyramid::shade(10.0);
    assert!(fine.0.iter().zip(want.0).all(|(a, b)| a.abs_diff(b) <= 1), "{fine:?}");
}

#[test]
fn raster_rejects_zero_scale() {
    let err = reconstruct_raster(&two_level_log(), &pyramid(), &ReconstructionRequest::new(SLIDE), Some(0))
        .unwrap_err();
    assert!(matches!(err, PanHistoryError::ZeroScale));
}

proptest! {
    #[test]
    fn disjoint_viewports_are_always_kept(
        cols in 1u32..6,
        rows in 1u32..6,
        cell in 8u32..200,
        threshold in 0.01f64..=1.0,
    ) {
        let mut log = LocalActivityLog::new();
        let mut seq = 0u32;
        for r in 0..rows {
            for c in 0..cols {
                seq += 1;
                let (x, y) = (f64::from(c * cell), f64::from(r * cell));
                log.append(
                    PanBuilder::new(SLIDE)
                        .seq(u64::from(seq))
                        .at(f64::from(seq))
                        .zoom(2.0)
                        .viewport((x, y), (x + f64::from(cell), y + f64::from(cell)))
                        .build(),
                )
                .unwrap();
            }
        }
        let prefs = ReconstructionPrefs {
            area_threshold: threshold,
            ..ReconstructionPrefs::default()
        };
        let request = ReconstructionRequest::new(SLIDE).with_prefs(prefs);
        let report = reconstruct_report(&log, &pyramid(), &request).unwrap().unwrap();

        prop_assert_eq!(report.zoom_patches[&2].rois.len(), usize::try_from(cols * rows).unwrap());
        prop_assert_eq!(report.width, i64::from(cols * cell));
        prop_assert_eq!(report.height, i64::from(rows * cell));
    }
}
