use foamcut_core::{intersect_line_plane, Plane, Point3, RailPair, Rails};
use proptest::prelude::*;

#[test]
fn test_rail_pair_reversed() {
    let left = vec![Point3::new(-365.0, 0.0, 0.0), Point3::new(-365.0, 0.0, 10.0)];
    let right = vec![Point3::new(365.0, 0.0, 0.0), Point3::new(365.0, 0.0, 10.0)];
    let pair = RailPair::new(left, right).unwrap();
    let rev = pair.reversed();
    assert_eq!(rev.first_rung(), pair.last_rung());
    assert_eq!(rev.point_count(), 2);
}

#[test]
fn test_rail_pair_rejects_mismatched_json() {
    let json = r#"{"left":[{"x":0.0,"y":0.0,"z":0.0}],"right":[]}"#;
    assert!(serde_json::from_str::<RailPair>(json).is_err());
}

#[test]
fn test_rung_lengths() {
    let rails = Rails::from_field_width(730.0);
    let pair = RailPair::new(
        vec![rails.left.from_local(0.0, 0.0)],
        vec![rails.right.from_local(0.0, 0.0)],
    )
    .unwrap();
    assert_eq!(pair.rung_lengths(), vec![730.0]);
}

proptest! {
    #[test]
    fn intersection_lies_on_plane(
        x0 in -100.0f64..-1.0, y0 in -100.0f64..100.0, z0 in 0.0f64..100.0,
        x1 in 1.0f64..100.0, y1 in -100.0f64..100.0, z1 in 0.0f64..100.0,
        rail in -400.0f64..400.0,
    ) {
        let p0 = Point3::new(x0, y0, z0);
        let p1 = Point3::new(x1, y1, z1);
        let hit = intersect_line_plane(&p0, &p1, &Plane::new(rail)).unwrap();
        prop_assert!((hit.x - rail).abs() < 1e-9);
        // Collinear with the input points.
        let cross = (p1 - p0).cross(&(hit - p0));
        prop_assert!(cross.length() <= 1e-6 * (1.0 + (hit - p0).length() * (p1 - p0).length()));
    }
}
