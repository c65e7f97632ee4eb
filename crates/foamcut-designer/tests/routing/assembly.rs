use foamcut_core::{Edge, Point3};
use foamcut_designer::{Anchor, DualRailProjector, Route, RouteAssembler, Segment, SegmentKind};
use foamcut_settings::{KerfDirection, KerfStrategy, MachineConfig};

fn config() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.kerf.strategy = KerfStrategy::None;
    config
}

/// Projection of a straight line in the y/z plane.
fn line(label: &str, from: (f64, f64), to: (f64, f64)) -> Segment {
    let edge = Edge::line(Point3::new(0.0, from.0, from.1), Point3::new(0.0, to.0, to.1));
    Segment::projection(label, &edge, &DualRailProjector::from_config(&config())).unwrap()
}

fn group(label: &str, segments: Vec<Segment>) -> Route {
    Route::group(label, segments, KerfDirection::Normal, &config())
}

#[test]
fn test_second_segment_reversed() {
    let route = group(
        "Profile",
        vec![
            line("A", (0.0, 0.0), (10.0, 0.0)),
            line("B", (20.0, 0.0), (10.0, 0.0)),
            line("C", (20.0, 0.0), (20.0, 10.0)),
        ],
    );
    assert!(route.is_valid(), "{}", route.error());
    assert_eq!(route.data(), vec![0, 1, 2]);
    assert_eq!(route.data_direction(), vec![false, true, false]);

    let path = route.path().unwrap();
    let ys: Vec<f64> = path.left().iter().map(|p| p.y).collect();
    assert_eq!(ys, vec![0.0, 10.0, 20.0, 20.0]);
    assert_eq!(path.left()[3].z, 10.0);
}

#[test]
fn test_first_segment_reversed() {
    let route = group(
        "Profile",
        vec![
            line("A", (10.0, 0.0), (0.0, 0.0)),
            line("B", (10.0, 0.0), (20.0, 0.0)),
        ],
    );
    assert_eq!(route.data_direction(), vec![true, false]);
    assert_eq!(route.path().unwrap().left()[0].y, 0.0);
}

#[test]
fn test_disconnected_segments() {
    let route = group(
        "Broken",
        vec![
            line("A", (0.0, 0.0), (10.0, 0.0)),
            line("B", (10.0, 0.0), (20.0, 0.0)),
            line("C", (50.0, 0.0), (60.0, 0.0)),
        ],
    );
    assert!(!route.is_valid());
    assert_eq!(route.error(), "ERROR: B not connected with C");
    assert!(route.path().is_none());
    assert!(route.data().is_empty());
}

#[test]
fn test_first_failure_stops_assembly() {
    let segments = vec![
        line("A", (0.0, 0.0), (10.0, 0.0)),
        line("B", (30.0, 0.0), (40.0, 0.0)),
        line("C", (70.0, 0.0), (80.0, 0.0)),
    ];
    let err = RouteAssembler::default()
        .assemble("Broken", &segments)
        .unwrap_err();
    assert_eq!(err.to_string(), "ERROR: A not connected with B");
}

#[test]
fn test_empty_route() {
    let route = group("Nothing", Vec::new());
    assert!(!route.is_valid());
    assert!(route.error().contains("has no segments"));
}

#[test]
fn test_rotation_breaks_continuity() {
    let route = group(
        "Turn",
        vec![
            line("A", (0.0, 0.0), (10.0, 0.0)),
            Segment::rotation("Rotation", 90.0, "Body"),
            line("B", (40.0, 5.0), (50.0, 5.0)),
        ],
    );
    assert!(route.is_valid(), "{}", route.error());
    assert_eq!(route.data_direction(), vec![false, false, false]);
    assert_eq!(route.breaks(), &[2]);
    assert_eq!(route.path().unwrap().point_count(), 4);

    let rotation = &route.spans()[1];
    assert_eq!(rotation.kind, SegmentKind::Rotation);
    assert!(rotation.is_empty());
}

#[test]
fn test_exit_enter_boundary_keeps_points() {
    let cfg = config();
    let projector = DualRailProjector::from_config(&cfg);
    let safe = cfg.travel.safe_height;
    let at = |y: f64| Anchor::single(Point3::new(0.0, y, 50.0));

    let segments = vec![
        Segment::enter("Enter", &at(0.0), safe, &projector).unwrap(),
        line("Top", (0.0, 50.0), (100.0, 50.0)),
        Segment::exit("Exit", &at(100.0), safe, &projector).unwrap(),
        Segment::enter("Enter001", &at(200.0), safe, &projector).unwrap(),
        line("Bottom", (200.0, 50.0), (300.0, 50.0)),
        Segment::exit("Exit001", &at(300.0), safe, &projector).unwrap(),
    ];
    let route = group("TwoParts", segments);

    assert!(route.is_valid(), "{}", route.error());
    assert_eq!(route.data_direction(), vec![false; 6]);
    assert_eq!(route.path().unwrap().point_count(), 8);
    assert_eq!(route.breaks(), &[4]);
    assert!(route.spans()[3].run_start);
    assert!(!route.spans()[4].run_start);
}

#[test]
fn test_pause_marks_last_point() {
    let route = group(
        "Dwell",
        vec![
            line("A", (0.0, 0.0), (10.0, 0.0)).with_pause(Some(2.5)),
            line("B", (10.0, 0.0), (20.0, 0.0)),
        ],
    );
    assert_eq!(route.pauses().len(), 1);
    assert_eq!(route.pauses()[0].index, 1);
    assert_eq!(route.pauses()[0].duration, 2.5);
}

#[test]
fn test_ungroup_returns_segments() {
    let segments = vec![
        line("A", (0.0, 0.0), (10.0, 0.0)),
        line("B", (10.0, 0.0), (20.0, 0.0)),
    ];
    let route = group("Profile", segments.clone());
    assert_eq!(route.ungroup(), segments);
}
