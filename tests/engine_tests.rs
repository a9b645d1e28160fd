//! End-to-end tests: build an engine over an overlay collection and stream
//! subject features through it.

use approx::assert_relative_eq;
use geo::{Area, BooleanOps, MultiPolygon, Polygon, line_string, polygon};
use geoverlap::{EngineConfig, OverlapEngine, OverlapError, PolygonRecord, robust_union};
use geoverlap::MergeConfig;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
        (x: x, y: y),
    ]
}

fn record(x: f64, y: f64, size: f64, id: &str) -> PolygonRecord {
    PolygonRecord::from_polygon(square(x, y, size), Vec::new(), id)
}

fn record_with_zone(x: f64, y: f64, size: f64, zone: &str, id: &str) -> PolygonRecord {
    PolygonRecord::from_polygon(
        square(x, y, size),
        vec![("zone".to_string(), zone.to_string())],
        id,
    )
}

// Unrepairable input: a ring collapsed onto a single segment with a
// non-finite coordinate.
fn unusable(id: &str) -> PolygonRecord {
    PolygonRecord::new(
        MultiPolygon::new(vec![Polygon::new(
            line_string![
                (x: 0.0, y: 0.0),
                (x: f64::NAN, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ],
            Vec::new(),
        )]),
        Vec::new(),
        id,
    )
}

#[test]
fn test_chained_squares_merge_into_one_member() {
    // Three squares overlapping in a chain: one group of three, merged
    // area 3 - 0.25 - 0.25 = 2.5.
    let overlay = vec![
        record(0.0, 0.0, 1.0, "a"),
        record(0.5, 0.5, 1.0, "b"),
        record(1.0, 1.0, 1.0, "c"),
    ];
    let config = EngineConfig::default().with_deduplication();
    let engine = OverlapEngine::build(overlay, &config).unwrap();

    assert_eq!(engine.member_count(), 1);
    assert_eq!(engine.load_stats().merged_groups, 1);

    let probe = record(-1.0, -1.0, 4.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_eq!(result.intersecting_count, 1);
    assert_relative_eq!(result.intersection_area, 2.5, epsilon = 1e-6);
}

#[test]
fn test_disjoint_squares_stay_separate() {
    let overlay = vec![record(0.0, 0.0, 1.0, "a"), record(10.0, 10.0, 1.0, "b")];
    let config = EngineConfig::default().with_deduplication();
    let engine = OverlapEngine::build(overlay, &config).unwrap();

    assert_eq!(engine.member_count(), 2);
    assert_eq!(engine.load_stats().merged_groups, 0);

    let probe = record(0.0, 0.0, 11.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_eq!(result.intersecting_count, 2);
    assert_relative_eq!(result.intersection_area, 2.0, epsilon = 1e-6);
}

#[test]
fn test_feature_outside_all_envelopes() {
    let overlay = vec![record(0.0, 0.0, 1.0, "a")];
    let engine = OverlapEngine::build(overlay, &EngineConfig::default()).unwrap();

    let probe = record(100.0, 100.0, 1.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_eq!(result.intersecting_count, 0);
    assert_relative_eq!(result.intersection_area, 0.0);
    assert_relative_eq!(result.feature_area, 1.0, epsilon = 1e-9);
}

#[test]
fn test_unusable_overlay_geometry_dropped() {
    init_logging();
    let overlay = vec![
        record(0.0, 0.0, 1.0, "a"),
        unusable("broken"),
        record(10.0, 10.0, 1.0, "b"),
    ];
    let engine = OverlapEngine::build(overlay, &EngineConfig::default()).unwrap();

    let stats = engine.load_stats();
    assert_eq!(stats.read, 3);
    assert_eq!(stats.kept, 2);
    assert_eq!(stats.dropped, 1);
    assert_eq!(engine.member_count(), 2);
}

#[test]
fn test_overlay_with_no_usable_geometry_is_fatal() {
    let overlay = vec![unusable("b1"), unusable("b2")];
    let err = OverlapEngine::build(overlay, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, OverlapError::EmptyInput));
}

#[test]
fn test_no_double_counting_after_merge() {
    // Two overlapping overlay polygons merge into one member; a probe
    // covering both must see area(probe ∩ (P1 ∪ P2)), not the sum of the
    // two individual intersections.
    let p1 = square(0.0, 0.0, 2.0);
    let p2 = square(1.0, 0.0, 2.0);
    let overlay = vec![
        PolygonRecord::from_polygon(p1.clone(), Vec::new(), "p1"),
        PolygonRecord::from_polygon(p2.clone(), Vec::new(), "p2"),
    ];
    let config = EngineConfig::default().with_deduplication();
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.member_count(), 1);

    let probe = record(0.5, 0.0, 2.0, "probe");
    let result = engine.accumulate(&probe).unwrap();

    let merged: MultiPolygon<f64> = p1.union(&p2);
    let expected = merged
        .intersection(&MultiPolygon::new(vec![square(0.5, 0.0, 2.0)]))
        .unsigned_area();
    let naive = p1
        .intersection(&square(0.5, 0.0, 2.0))
        .unsigned_area()
        + p2.intersection(&square(0.5, 0.0, 2.0)).unsigned_area();

    assert_eq!(result.intersecting_count, 1);
    assert_relative_eq!(result.intersection_area, expected, epsilon = 1e-6);
    assert!(result.intersection_area < naive - 1e-6);
}

#[test]
fn test_grouped_accumulation() {
    let overlay = vec![
        record_with_zone(0.0, 0.0, 2.0, "A", "a1"),
        record_with_zone(5.0, 0.0, 2.0, "B", "b1"),
        record_with_zone(5.0, 5.0, 2.0, "B", "b2"),
    ];
    let config = EngineConfig::default().with_group_field("zone");
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.group_keys(), ["A", "B"]);

    // Covers all of zone A and both zone B squares partially.
    let probe = record(0.0, 0.0, 7.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_eq!(result.intersecting_count, 3);

    let zone_a = &result.group_stats["A"];
    assert_eq!(zone_a.count, 1);
    assert_relative_eq!(zone_a.area, 4.0, epsilon = 1e-6);

    let zone_b = &result.group_stats["B"];
    assert_eq!(zone_b.count, 2);
    assert_relative_eq!(zone_b.area, 4.0 + 2.0 * 2.0, epsilon = 1e-6);
}

#[test]
fn test_merged_group_keeps_first_key() {
    let overlay = vec![
        record_with_zone(0.0, 0.0, 1.0, "A", "a1"),
        record_with_zone(0.5, 0.0, 1.0, "B", "b1"),
    ];
    let config = EngineConfig::default()
        .with_deduplication()
        .with_group_field("zone");
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.member_count(), 1);

    let probe = record(0.0, 0.0, 2.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_eq!(result.intersecting_count, 1);
    assert!(result.group_stats.contains_key("A"));
    assert!(!result.group_stats.contains_key("B"));
}

#[test]
fn test_numeric_group_key_order() {
    let overlay = vec![
        record_with_zone(0.0, 0.0, 1.0, "10", "a"),
        record_with_zone(2.0, 0.0, 1.0, "9", "b"),
        record_with_zone(4.0, 0.0, 1.0, "2", "c"),
    ];
    let config = EngineConfig::default().with_group_field("zone");
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.group_keys(), ["2", "9", "10"]);
}

#[test]
fn test_mixed_group_keys_fall_back_to_lexicographic() {
    let overlay = vec![
        record_with_zone(0.0, 0.0, 1.0, "2", "a"),
        record_with_zone(2.0, 0.0, 1.0, "10", "b"),
        record_with_zone(4.0, 0.0, 1.0, "1a", "c"),
    ];
    let config = EngineConfig::default().with_group_field("zone");
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.group_keys(), ["10", "1a", "2"]);
}

#[test]
fn test_unusable_subject_feature_skipped() {
    let overlay = vec![record(0.0, 0.0, 1.0, "a")];
    let engine = OverlapEngine::build(overlay, &EngineConfig::default()).unwrap();
    assert!(engine.accumulate(&unusable("probe")).is_none());
}

#[test]
fn test_streaming_run_totals() {
    let overlay = vec![record(0.0, 0.0, 10.0, "a")];
    let engine = OverlapEngine::build(overlay, &EngineConfig::default()).unwrap();

    let subjects = vec![
        record(0.0, 0.0, 1.0, "s1"),
        record(2.0, 2.0, 1.0, "s2"),
        unusable("s3"),
        record(100.0, 100.0, 1.0, "s4"),
    ];
    let mut emitted = Vec::new();
    let total = engine.run(subjects, |record, result| {
        emitted.push((record.source_id.clone(), result.intersection_area));
    });

    // The unusable feature is skipped; the far-away one emits zeros.
    assert_eq!(emitted.len(), 3);
    assert_relative_eq!(total, 2.0, epsilon = 1e-6);
    assert_eq!(emitted[2].0, "s4");
    assert_relative_eq!(emitted[2].1, 0.0);
}

#[test]
fn test_repaired_overlay_geometry_counted() {
    // Bowtie self-intersection: repairable, kept with a repair counter.
    let bowtie = PolygonRecord::new(
        MultiPolygon::new(vec![Polygon::new(
            line_string![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 2.0, y: 0.0),
                (x: 0.0, y: 2.0),
                (x: 0.0, y: 0.0),
            ],
            Vec::new(),
        )]),
        Vec::new(),
        "bowtie",
    );
    let engine = OverlapEngine::build(vec![bowtie], &EngineConfig::default()).unwrap();
    assert_eq!(engine.load_stats().repaired, 1);

    let probe = record(0.0, 0.0, 2.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_relative_eq!(result.intersection_area, 2.0, epsilon = 1e-6);
}

#[test]
fn test_area_monotonicity_through_merge() {
    let a = MultiPolygon::new(vec![square(0.0, 0.0, 2.0)]);
    let b = a.union(&MultiPolygon::new(vec![square(1.0, 0.0, 2.0)]));
    let area_a = a.unsigned_area();
    let area_b = b.unsigned_area();

    let merged = robust_union(vec![a, b], &MergeConfig::default())
        .unwrap()
        .unwrap();
    assert!(merged.unsigned_area() >= area_a - 1e-9);
    assert!(merged.unsigned_area() >= area_b - 1e-9);
}

#[test]
fn test_large_overlay_without_dedup() {
    // A dense grid of overlapping squares, no deduplication: every square
    // is its own member and each counts separately.
    let mut overlay = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            overlay.push(record(i as f64 * 0.8, j as f64 * 0.8, 1.0, "g"));
        }
    }
    let engine = OverlapEngine::build(overlay, &EngineConfig::default()).unwrap();
    assert_eq!(engine.member_count(), 100);

    let probe = record(0.0, 0.0, 1.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    // The probe square touches the 2x2 block of neighbors at (0,0),
    // (0.8,0), (0,0.8), (0.8,0.8) with positive area.
    assert_eq!(result.intersecting_count, 4);
}

#[test]
fn test_large_overlay_with_dedup_merges_everything() {
    let mut overlay = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            overlay.push(record(i as f64 * 0.8, j as f64 * 0.8, 1.0, "g"));
        }
    }
    let config = EngineConfig::default().with_deduplication();
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.member_count(), 1);

    let probe = record(-1.0, -1.0, 12.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    let side = 9.0 * 0.8 + 1.0;
    assert_eq!(result.intersecting_count, 1);
    assert_relative_eq!(result.intersection_area, side * side, epsilon = 1e-6);
}

#[test]
fn test_tiled_member_counts_once() {
    // Force tiling with a tiny vertex band so the merged member is split
    // into grid tiles; a probe spanning several tiles still counts one
    // intersecting member and the exact overlap area.
    let config = EngineConfig::default().with_tiling(geoverlap::TilingConfig {
        vertex_count_medium: 3,
        vertex_count_large: 1_000_000,
        ..geoverlap::TilingConfig::default()
    });
    let overlay = vec![record(0.0, 0.0, 10.0, "big")];
    let engine = OverlapEngine::build(overlay, &config).unwrap();
    assert_eq!(engine.member_count(), 1);

    let probe = record(1.0, 1.0, 6.0, "probe");
    let result = engine.accumulate(&probe).unwrap();
    assert_eq!(result.intersecting_count, 1);
    assert_relative_eq!(result.intersection_area, 36.0, epsilon = 1e-6);
}
