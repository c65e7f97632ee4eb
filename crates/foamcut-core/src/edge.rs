//! Source curves supplied by the authoring layer
//!
//! An [`Edge`] is one piece of raw geometry: a vertex, a straight line, a
//! three-point circular arc, or a densely sampled free-form polyline. The
//! projector turns pairs of edges into matched rail samples.

use crate::error::GeometryError;
use crate::geometry::{polyline_length, Point3, COMMON_POINT_TOLERANCE, STRAIGHT_LINE_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Samples taken per edge when estimating closest approach or planarity.
const PROBE_SAMPLES: usize = 33;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Edge {
    Vertex { point: Point3 },
    Line { start: Point3, end: Point3 },
    /// Circular arc through three points, traversed start -> mid -> end.
    Arc { start: Point3, mid: Point3, end: Point3 },
    Polyline { points: Vec<Point3> },
}

/// Orthonormal frame of a circular arc.
#[derive(Debug, Clone, Copy)]
struct ArcFrame {
    center: Point3,
    radius: f64,
    u: Point3,
    v: Point3,
    sweep: f64,
}

impl ArcFrame {
    fn point_at_angle(&self, theta: f64) -> Point3 {
        self.center + (self.u * theta.cos() + self.v * theta.sin()) * self.radius
    }
}

fn arc_frame(start: &Point3, mid: &Point3, end: &Point3) -> Option<ArcFrame> {
    let a = *start - *end;
    let b = *mid - *end;
    let axb = a.cross(&b);
    let denom = 2.0 * axb.dot(&axb);
    if denom < 1e-18 {
        return None;
    }

    let num = (b * a.dot(&a) - a * b.dot(&b)).cross(&axb);
    let center = *end + num * (1.0 / denom);
    let radius = start.distance_to(&center);
    if radius < 1e-12 {
        return None;
    }

    // Turning direction of start -> mid -> end fixes the arc orientation.
    let turn = (*mid - *start).cross(&(*end - *mid));
    let normal = turn * (1.0 / turn.length());
    let u = (*start - center) * (1.0 / radius);
    let v = normal.cross(&u);

    let rel = *end - center;
    let mut sweep = rel.dot(&v).atan2(rel.dot(&u));
    if sweep <= 0.0 {
        sweep += 2.0 * PI;
    }

    Some(ArcFrame {
        center,
        radius,
        u,
        v,
        sweep,
    })
}

impl Edge {
    pub fn line(start: Point3, end: Point3) -> Self {
        Edge::Line { start, end }
    }

    pub fn vertex(point: Point3) -> Self {
        Edge::Vertex { point }
    }

    /// Check that the edge can be sampled.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let points: Vec<Point3> = match self {
            Edge::Vertex { point } => vec![*point],
            Edge::Line { start, end } => vec![*start, *end],
            Edge::Arc { start, mid, end } => {
                if arc_frame(start, mid, end).is_none() {
                    return Err(GeometryError::DegenerateArc {
                        reason: format!("points {} {} {} are collinear", start, mid, end),
                    });
                }
                vec![*start, *mid, *end]
            }
            Edge::Polyline { points } => {
                if points.is_empty() {
                    return Err(GeometryError::Empty {
                        context: "polyline edge".to_string(),
                    });
                }
                points.clone()
            }
        };

        if points.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite {
                context: "edge".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self, Edge::Vertex { .. })
    }

    pub fn first(&self) -> Point3 {
        match self {
            Edge::Vertex { point } => *point,
            Edge::Line { start, .. } | Edge::Arc { start, .. } => *start,
            Edge::Polyline { points } => points.first().copied().unwrap_or_default(),
        }
    }

    pub fn last(&self) -> Point3 {
        match self {
            Edge::Vertex { point } => *point,
            Edge::Line { end, .. } | Edge::Arc { end, .. } => *end,
            Edge::Polyline { points } => points.last().copied().unwrap_or_default(),
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Edge::Vertex { .. } => 0.0,
            Edge::Line { start, end } => start.distance_to(end),
            Edge::Arc { start, mid, end } => match arc_frame(start, mid, end) {
                Some(frame) => frame.radius * frame.sweep,
                None => polyline_length(&[*start, *mid, *end]),
            },
            Edge::Polyline { points } => polyline_length(points),
        }
    }

    pub fn reversed(&self) -> Edge {
        match self {
            Edge::Vertex { point } => Edge::Vertex { point: *point },
            Edge::Line { start, end } => Edge::Line {
                start: *end,
                end: *start,
            },
            Edge::Arc { start, mid, end } => Edge::Arc {
                start: *end,
                mid: *mid,
                end: *start,
            },
            Edge::Polyline { points } => Edge::Polyline {
                points: points.iter().rev().copied().collect(),
            },
        }
    }

    /// Point at arc length `s` from the start, clamped to the edge.
    pub fn point_at(&self, s: f64) -> Point3 {
        let total = self.length();
        let s = s.clamp(0.0, total);
        match self {
            Edge::Vertex { point } => *point,
            Edge::Line { start, end } => {
                if total <= 0.0 {
                    *start
                } else {
                    start.lerp(end, s / total)
                }
            }
            Edge::Arc { start, mid, end } => match arc_frame(start, mid, end) {
                Some(frame) => frame.point_at_angle(s / frame.radius),
                None => point_along(&[*start, *mid, *end], s),
            },
            Edge::Polyline { points } => point_along(points, s),
        }
    }

    /// True iff the chord between the endpoints matches the curve length.
    ///
    /// A vertex has no chord and is never straight.
    pub fn is_straight_line(&self) -> bool {
        match self {
            Edge::Vertex { .. } => false,
            Edge::Line { .. } => true,
            _ => {
                let length = self.length();
                let chord = self.first().distance_to(&self.last());
                is_close(chord, length, STRAIGHT_LINE_TOLERANCE)
            }
        }
    }

    /// Exactly `count` points evenly spaced by arc length, endpoints included.
    pub fn discretize_count(&self, count: usize) -> Vec<Point3> {
        match count {
            0 => Vec::new(),
            1 => vec![self.first()],
            _ => {
                let total = self.length();
                (0..count)
                    .map(|i| {
                        if i == count - 1 {
                            self.last()
                        } else {
                            self.point_at(total * i as f64 / (count - 1) as f64)
                        }
                    })
                    .collect()
            }
        }
    }

    /// Arc-length sampling every `step` units.
    ///
    /// Straight lines and edges too short for two samples collapse to their
    /// endpoints.
    pub fn discretize(&self, step: f64) -> Vec<Point3> {
        if self.is_vertex() {
            return vec![self.first()];
        }
        let count = sample_count(self.length(), step);
        if count <= 2 || self.is_straight_line() {
            vec![self.first(), self.last()]
        } else {
            self.discretize_count(count)
        }
    }

    fn probe_points(&self) -> Vec<Point3> {
        match self {
            Edge::Vertex { point } => vec![*point],
            Edge::Line { start, end } => vec![*start, *end],
            Edge::Polyline { points } if points.len() <= PROBE_SAMPLES => points.clone(),
            _ => self.discretize_count(PROBE_SAMPLES),
        }
    }
}

/// Number of samples for a curve of `length` at spacing `step`.
pub fn sample_count(length: f64, step: f64) -> usize {
    if step <= 0.0 || !length.is_finite() {
        return 2;
    }
    (length / step).floor().max(0.0) as usize
}

fn is_close(a: f64, b: f64, rel_tol: f64) -> bool {
    (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}

fn point_along(points: &[Point3], s: f64) -> Point3 {
    let mut remaining = s;
    for w in points.windows(2) {
        let seg = w[0].distance_to(&w[1]);
        if remaining <= seg {
            if seg <= 0.0 {
                return w[0];
            }
            return w[0].lerp(&w[1], remaining / seg);
        }
        remaining -= seg;
    }
    points.last().copied().unwrap_or_default()
}

/// Closest points between segments `p1-q1` and `p2-q2`.
fn closest_points_on_segments(p1: Point3, q1: Point3, p2: Point3, q2: Point3) -> (Point3, Point3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);
    let eps = 1e-12;

    let (s, t) = if a <= eps && e <= eps {
        (0.0, 0.0)
    } else if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > eps {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

fn closest_approach(a: &Edge, b: &Edge) -> (Point3, Point3) {
    let pa = a.probe_points();
    let pb = b.probe_points();
    let segments = |pts: &[Point3]| -> Vec<(Point3, Point3)> {
        if pts.len() == 1 {
            vec![(pts[0], pts[0])]
        } else {
            pts.windows(2).map(|w| (w[0], w[1])).collect()
        }
    };

    let mut best = (a.first(), b.first());
    let mut best_dist = f64::INFINITY;
    for (s1, e1) in segments(&pa) {
        for (s2, e2) in segments(&pb) {
            let (c1, c2) = closest_points_on_segments(s1, e1, s2, e2);
            let d = c1.distance_to(&c2);
            if d < best_dist {
                best_dist = d;
                best = (c1, c2);
            }
        }
    }
    best
}

/// Endpoints of two curves, oriented so that index 0 of each pair faces the
/// other curve's index 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncedEndpoints {
    pub a_first: Point3,
    pub a_last: Point3,
    pub b_first: Point3,
    pub b_last: Point3,
}

/// Pair each curve's endpoints using their closest approach.
///
/// Each curve starts at the endpoint nearest its closest-approach point.
/// When the closest approach cannot tell the ends apart (parallel
/// curves), the pairing with the shorter total rung length is used.
/// Either curve may come back reversed relative to its stored order.
pub fn synchronize_endpoints(a: &Edge, b: &Edge) -> SyncedEndpoints {
    let (ca, cb) = closest_approach(a, b);

    let orient = |edge: &Edge, near: &Point3| -> Option<(Point3, Point3)> {
        let (first, last) = (edge.first(), edge.last());
        let d_first = first.distance_to(near);
        let d_last = last.distance_to(near);
        if (d_first - d_last).abs() <= COMMON_POINT_TOLERANCE {
            None
        } else if d_first < d_last {
            Some((first, last))
        } else {
            Some((last, first))
        }
    };

    match (orient(a, &ca), orient(b, &cb)) {
        (Some((a_first, a_last)), Some((b_first, b_last))) => SyncedEndpoints {
            a_first,
            a_last,
            b_first,
            b_last,
        },
        _ => {
            let (a_first, a_last) = (a.first(), a.last());
            let (b0, b1) = (b.first(), b.last());
            let straight = a_first.distance_to(&b0) + a_last.distance_to(&b1);
            let crossed = a_first.distance_to(&b1) + a_last.distance_to(&b0);
            let (b_first, b_last) = if crossed < straight { (b1, b0) } else { (b0, b1) };
            SyncedEndpoints {
                a_first,
                a_last,
                b_first,
                b_last,
            }
        }
    }
}

/// Whether both edges lie in one common plane.
pub fn are_coplanar(a: &Edge, b: &Edge) -> bool {
    let mut points = a.probe_points();
    points.extend(b.probe_points());
    if points.len() < 4 {
        return true;
    }

    let extent = points
        .iter()
        .flat_map(|p| points.iter().map(move |q| p.distance_to(q)))
        .fold(0.0_f64, f64::max);
    let tolerance = 1e-6 * extent.max(1.0);

    let origin = points[0];
    let Some(far) = points
        .iter()
        .copied()
        .max_by(|p, q| origin.distance_to(p).total_cmp(&origin.distance_to(q)))
    else {
        return true;
    };
    let axis = far - origin;
    if axis.length() <= tolerance {
        return true;
    }

    let Some(normal) = points
        .iter()
        .map(|p| axis.cross(&(*p - origin)))
        .max_by(|m, n| m.length().total_cmp(&n.length()))
    else {
        return true;
    };
    if normal.length() <= tolerance * axis.length() {
        // All points on one line.
        return true;
    }

    let unit = normal * (1.0 / normal.length());
    points
        .iter()
        .all(|p| (*p - origin).dot(&unit).abs() <= tolerance)
}
