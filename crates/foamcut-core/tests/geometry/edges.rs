use foamcut_core::{Edge, Point3};
use proptest::prelude::*;

fn arc(radius: f64, x: f64) -> Edge {
    let h = radius / 2f64.sqrt();
    Edge::Arc {
        start: Point3::new(x, radius, 0.0),
        mid: Point3::new(x, h, h),
        end: Point3::new(x, 0.0, radius),
    }
}

#[test]
fn test_edge_serde_tagged() {
    let json = r#"{"type":"line","start":{"x":0.0,"y":0.0,"z":0.0},"end":{"x":0.0,"y":10.0,"z":0.0}}"#;
    let edge: Edge = serde_json::from_str(json).unwrap();
    assert!(edge.is_straight_line());
    assert_eq!(edge.length(), 10.0);
}

#[test]
fn test_reversed_arc_keeps_length() {
    let a = arc(25.0, 0.0);
    let r = a.reversed();
    assert!((a.length() - r.length()).abs() < 1e-9);
    assert_eq!(r.first(), a.last());
}

#[test]
fn test_polyline_point_at_walks_segments() {
    let edge = Edge::Polyline {
        points: vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 10.0),
        ],
    };
    assert_eq!(edge.point_at(15.0), Point3::new(0.0, 10.0, 5.0));
    assert_eq!(edge.point_at(100.0), Point3::new(0.0, 10.0, 10.0));
    assert!(!edge.is_straight_line());
}

proptest! {
    #[test]
    fn discretized_arc_keeps_endpoints(radius in 5.0f64..200.0, step in 0.1f64..5.0) {
        let edge = arc(radius, 0.0);
        let points = edge.discretize(step);
        prop_assert!(points.len() >= 2);
        prop_assert_eq!(points[0], edge.first());
        prop_assert_eq!(points[points.len() - 1], edge.last());
    }

    #[test]
    fn discretize_is_deterministic(radius in 5.0f64..200.0, step in 0.1f64..5.0) {
        let edge = arc(radius, 3.0);
        prop_assert_eq!(edge.discretize(step), edge.discretize(step));
    }

    #[test]
    fn arc_samples_stay_on_circle(radius in 5.0f64..200.0) {
        let edge = arc(radius, 0.0);
        for p in edge.discretize_count(17) {
            let r = (p.y * p.y + p.z * p.z).sqrt();
            prop_assert!((r - radius).abs() < 1e-6);
        }
    }
}
