use foamcut_core::{Edge, Point3};
use foamcut_designer::{Anchor, DualRailProjector, KerfOffsetEngine, Route, Segment, SegmentEnd};
use foamcut_settings::{KerfDirection, KerfStrategy, MachineConfig};
use proptest::prelude::*;

fn projection(config: &MachineConfig, label: &str, from: (f64, f64), to: (f64, f64)) -> Segment {
    let edge = Edge::line(Point3::new(0.0, from.0, from.1), Point3::new(0.0, to.0, to.1));
    Segment::projection(label, &edge, &DualRailProjector::from_config(config)).unwrap()
}

fn arc(config: &MachineConfig, radius: f64, sweep: f64) -> Segment {
    let at = |a: f64| Point3::new(0.0, radius * a.cos(), radius * a.sin());
    let edge = Edge::Arc {
        start: at(0.0),
        mid: at(sweep / 2.0),
        end: at(sweep),
    };
    Segment::projection("Arc", &edge, &DualRailProjector::from_config(config)).unwrap()
}

#[test]
fn test_static_offset_shifts_left_of_travel() {
    let config = MachineConfig::default();
    let segment = projection(&config, "Top", (0.0, 0.0), (10.0, 0.0));
    let route = Route::group("Top", vec![segment], KerfDirection::Normal, &config);

    let offset = route.offset().unwrap();
    assert!((offset.left()[0].z - 0.6).abs() < 1e-12);
    assert!((offset.right()[1].z - 0.6).abs() < 1e-12);
    assert_eq!(offset.left()[0].x, -365.0);
}

#[test]
fn test_segment_override_wins() {
    let config = MachineConfig::default();
    let segment = projection(&config, "Top", (0.0, 0.0), (10.0, 0.0))
        .with_kerf_direction(Some(KerfDirection::Reversed));
    let route = Route::group("Top", vec![segment], KerfDirection::Normal, &config);
    assert!((route.offset().unwrap().left()[0].z + 0.6).abs() < 1e-12);
}

#[test]
fn test_strategy_none_reproduces_path() {
    let mut config = MachineConfig::default();
    config.kerf.strategy = KerfStrategy::None;
    let segments = vec![
        projection(&config, "A", (0.0, 0.0), (10.0, 0.0)),
        arc(&config, 10.0, 1.5),
    ];
    let route = Route::group("Mixed", segments, KerfDirection::Normal, &config);
    assert_eq!(route.offset(), route.path());
}

#[test]
fn test_corner_joint_is_trimmed() {
    let config = MachineConfig::default();
    let segments = vec![
        projection(&config, "Bottom", (0.0, 0.0), (50.0, 0.0)),
        projection(&config, "Side", (50.0, 0.0), (50.0, 30.0)),
    ];
    let route = Route::group("Corner", segments, KerfDirection::Normal, &config);
    assert!(route.warnings().is_empty(), "{:?}", route.warnings());

    let offset = route.offset().unwrap();
    assert_eq!(offset.point_count(), 3);
    // Inside corner of the two offset lines.
    assert!((offset.left()[1].y - 49.4).abs() < 1e-9);
    assert!((offset.left()[1].z - 0.6).abs() < 1e-9);
}

#[test]
fn test_lift_is_not_joined_to_following_traverse() {
    let config = MachineConfig::default();
    let projector = DualRailProjector::from_config(&config);
    let top = projection(&config, "Top", (0.0, 50.0), (100.0, 50.0));
    let top_end = Anchor::at_segment_end(&top, SegmentEnd::Last).unwrap();
    let exit = Segment::exit("Exit", &top_end, config.travel.safe_height, &projector).unwrap();
    let exit_end = Anchor::at_segment_end(&exit, SegmentEnd::Last).unwrap();
    let traverse = Segment::move_by("Traverse", &exit_end, 50.0, 0.0, &projector).unwrap();

    let route = Route::group("Lift", vec![top, exit, traverse], KerfDirection::Normal, &config);
    assert!(route.is_valid(), "{}", route.error());
    assert_eq!(route.path().unwrap().point_count(), 4);
    assert_eq!(route.breaks(), &[3]);

    let offset = route.offset().unwrap();
    // Top of the lift keeps its own offset instead of being extended to
    // meet the traverse.
    assert!((offset.left()[2].y - 99.4).abs() < 1e-9);
    assert!((offset.left()[2].z - 200.0).abs() < 1e-9);
    assert!((offset.left()[3].y - 150.0).abs() < 1e-9);
    assert!((offset.left()[3].z - 200.6).abs() < 1e-9);
    // The bottom corner is still trimmed inside the same run.
    assert!((offset.left()[1].y - 99.4).abs() < 1e-9);
    assert!((offset.left()[1].z - 50.6).abs() < 1e-9);
}

#[test]
fn test_dynamic_offsets_follow_rail_speed() {
    let mut config = MachineConfig::default();
    config.kerf.strategy = KerfStrategy::Dynamic;
    config.kerf.degree = 2.0;

    let root = Edge::line(Point3::new(-100.0, 0.0, 0.0), Point3::new(-100.0, 100.0, 0.0));
    let tip = Edge::line(Point3::new(100.0, 0.0, 0.0), Point3::new(100.0, 50.0, 0.0));
    let projector = DualRailProjector::from_config(&config);
    let segment = Segment::path("Wing", &root, &tip, Default::default(), &projector).unwrap();
    let movement = segment.movement().unwrap();

    let engine = KerfOffsetEngine::from_config(&config);
    let (left, right) = engine.offsets_for(movement, KerfDirection::Normal);
    assert!((left - 0.6 * 166.25 / 100.0).abs() < 1e-9);
    assert!((right - 0.6 * 16.25 / 50.0 / 2.0).abs() < 1e-9);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn offset_preserves_point_count(
        radius in 20.0f64..80.0,
        sweep in 0.3f64..2.5,
        length in 0.1f64..2.0,
    ) {
        let mut config = MachineConfig::default();
        config.kerf.length = length;
        let route = Route::group("Arc", vec![arc(&config, radius, sweep)], KerfDirection::Normal, &config);

        let path = route.path().unwrap();
        let offset = route.offset().unwrap();
        prop_assert_eq!(offset.point_count(), path.point_count());
        prop_assert_eq!(offset.left().len(), offset.right().len());
        prop_assert!(offset.left().iter().all(Point3::is_finite));
    }

    #[test]
    fn recompute_is_idempotent(
        radius in 20.0f64..80.0,
        sweep in 0.3f64..2.5,
    ) {
        let config = MachineConfig::default();
        let segments = vec![
            projection(&config, "Lead", (radius + 20.0, 0.0), (radius, 0.0)),
            arc(&config, radius, sweep),
        ];
        let mut route = Route::group("Arc", segments, KerfDirection::Normal, &config);
        let first = route.offset().cloned();
        route.recompute(&config);
        prop_assert_eq!(route.offset().cloned(), first);
        prop_assert_eq!(route.data_direction(), vec![false, false]);
    }
}
