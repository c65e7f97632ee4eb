use foamcut_core::{Point3, RailPair, Rails};
use foamcut_designer::{Movement, MovementKind, Route, Segment, WireStretchValidator};
use foamcut_settings::{KerfDirection, MachineConfig};
use proptest::prelude::*;

#[test]
fn test_route_reports_stretch() {
    let config = MachineConfig::default();
    let rails = Rails::from_field_width(config.geometry.field_width);
    let pair = RailPair::new(
        vec![rails.left.from_local(0.0, 0.0), rails.left.from_local(100.0, 0.0)],
        vec![rails.right.from_local(0.0, 0.0), rails.right.from_local(0.0, 0.0)],
    )
    .unwrap();
    let segment = Segment::Movement(Movement {
        label: "Skew".to_string(),
        kind: MovementKind::Path,
        rails: pair,
        inverted: false,
        left_edge_length: 100.0,
        right_edge_length: 0.0,
        pause: None,
        kerf_direction: Some(KerfDirection::None),
    });

    let route = Route::group("Skewed", vec![segment], KerfDirection::Normal, &config);
    assert!(route.is_valid());
    assert_eq!(route.warnings().len(), 1);
    assert!(route.warnings()[0].starts_with("Wire about to break in Skewed"));
}

proptest! {
    #[test]
    fn flags_exactly_the_overstretched_rungs(
        shifts in prop::collection::vec(-200.0f64..200.0, 1..40),
        tolerance in 0.0f64..20.0,
    ) {
        let rails = Rails::from_field_width(730.0);
        let left: Vec<Point3> = shifts.iter().map(|_| rails.left.from_local(0.0, 0.0)).collect();
        let right: Vec<Point3> = shifts.iter().map(|&s| rails.right.from_local(s, 0.0)).collect();
        let pair = RailPair::new(left.clone(), right.clone()).unwrap();

        let flagged = WireStretchValidator::new(730.0, tolerance).check(&pair);
        let expected: Vec<usize> = shifts
            .iter()
            .enumerate()
            .filter(|(i, _)| left[*i].distance_to(&right[*i]) - 730.0 > tolerance)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(flagged, expected);
    }
}
