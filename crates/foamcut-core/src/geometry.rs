//! Geometry primitives for dual-rail toolpaths
//!
//! The machine frame places the wire along X. Each carriage moves in a
//! plane of constant X (a rail) using (Y, Z) as horizontal and vertical
//! travel.

use crate::error::GeometryError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Distance under which two points are treated as the same point.
pub const COMMON_POINT_TOLERANCE: f64 = 0.01;

/// Relative tolerance between chord and curve length for straight-line detection.
pub const STRAIGHT_LINE_TOLERANCE: f64 = 1e-7;

/// Immutable point in machine space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// Position along the wire (rail separation axis)
    pub x: f64,
    /// Horizontal carriage coordinate
    pub y: f64,
    /// Vertical carriage coordinate
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Point3) -> f64 {
        (*other - *self).length()
    }

    /// Euclidean norm when the point is read as a vector.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_equal(&self, other: &Point3, tolerance: f64) -> bool {
        self.distance_to(other) <= tolerance
    }

    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        *self + (*other - *self) * t
    }

    pub fn dot(&self, other: &Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Point3) -> Point3 {
        Vector3::from(*self).cross(&Vector3::from(*other)).into()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<Point3> for Vector3<f64> {
    fn from(p: Point3) -> Self {
        Vector3::new(p.x, p.y, p.z)
    }
}

impl From<Vector3<f64>> for Point3 {
    fn from(v: Vector3<f64>) -> Self {
        Point3::new(v.x, v.y, v.z)
    }
}

/// A rail: the carriage plane at a fixed offset along the wire axis.
///
/// Local 2D coordinates are `(y, z)`, so both rails share one handedness
/// when viewed from the same side of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub x: f64,
}

impl Plane {
    pub const fn new(x: f64) -> Self {
        Self { x }
    }

    pub fn to_local(&self, p: &Point3) -> [f64; 2] {
        [p.y, p.z]
    }

    pub fn from_local(&self, u: f64, v: f64) -> Point3 {
        Point3::new(self.x, u, v)
    }

    /// Orthogonal projection onto the plane.
    pub fn project(&self, p: &Point3) -> Point3 {
        Point3::new(self.x, p.y, p.z)
    }

    pub fn distance_to(&self, p: &Point3) -> f64 {
        (p.x - self.x).abs()
    }
}

/// The two rail planes of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rails {
    pub left: Plane,
    pub right: Plane,
}

impl Rails {
    /// Rails placed symmetrically around the machine origin.
    pub fn from_field_width(field_width: f64) -> Self {
        Self {
            left: Plane::new(-field_width / 2.0),
            right: Plane::new(field_width / 2.0),
        }
    }

    /// Distance between the rails, the nominal wire length.
    pub fn field_width(&self) -> f64 {
        (self.right.x - self.left.x).abs()
    }
}

/// Matched Left/Right point arrays. Index `i` on both sides is one rung.
///
/// Both sides always hold the same number of points, and at least one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRailPair")]
pub struct RailPair {
    left: Vec<Point3>,
    right: Vec<Point3>,
}

#[derive(Deserialize)]
struct RawRailPair {
    left: Vec<Point3>,
    right: Vec<Point3>,
}

impl TryFrom<RawRailPair> for RailPair {
    type Error = GeometryError;

    fn try_from(raw: RawRailPair) -> Result<Self, Self::Error> {
        RailPair::new(raw.left, raw.right)
    }
}

impl RailPair {
    pub fn new(left: Vec<Point3>, right: Vec<Point3>) -> Result<Self, GeometryError> {
        if left.len() != right.len() {
            return Err(GeometryError::RailMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        if left.is_empty() {
            return Err(GeometryError::Empty {
                context: "rail pair".to_string(),
            });
        }
        if left.iter().chain(right.iter()).any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite {
                context: "rail pair".to_string(),
            });
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &[Point3] {
        &self.left
    }

    pub fn right(&self) -> &[Point3] {
        &self.right
    }

    /// Number of rungs.
    pub fn point_count(&self) -> usize {
        self.left.len()
    }

    pub fn rung(&self, index: usize) -> Option<(Point3, Point3)> {
        Some((*self.left.get(index)?, *self.right.get(index)?))
    }

    pub fn first_rung(&self) -> (Point3, Point3) {
        (self.left[0], self.right[0])
    }

    pub fn last_rung(&self) -> (Point3, Point3) {
        let last = self.left.len() - 1;
        (self.left[last], self.right[last])
    }

    pub fn reversed(&self) -> RailPair {
        let mut left = self.left.clone();
        let mut right = self.right.clone();
        left.reverse();
        right.reverse();
        RailPair { left, right }
    }

    /// Wire length at every rung.
    pub fn rung_lengths(&self) -> Vec<f64> {
        self.left
            .iter()
            .zip(self.right.iter())
            .map(|(l, r)| l.distance_to(r))
            .collect()
    }

    pub fn left_length(&self) -> f64 {
        polyline_length(&self.left)
    }

    pub fn right_length(&self) -> f64 {
        polyline_length(&self.right)
    }

    pub fn into_parts(self) -> (Vec<Point3>, Vec<Point3>) {
        (self.left, self.right)
    }
}

/// Total length of an open polyline.
pub fn polyline_length(points: &[Point3]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Intersect the infinite line through `p0` and `p1` with a rail plane.
///
/// When the two points coincide, `p1` is nudged one unit along the wire
/// axis so the line still crosses the rail.
pub fn intersect_line_plane(
    p0: &Point3,
    p1: &Point3,
    plane: &Plane,
) -> Result<Point3, GeometryError> {
    let mut end = *p1;
    if p0.is_equal(p1, COMMON_POINT_TOLERANCE) {
        end.x += 1.0;
    }

    let origin = Vector3::from(*p0);
    let direction = Vector3::from(end) - origin;
    let denom = Vector3::x().dot(&direction);

    if denom.abs() < 1e-12 {
        return Err(GeometryError::ParallelToRail {
            from: p0.to_string(),
            to: p1.to_string(),
            rail_x: plane.x,
        });
    }

    let t = (plane.x - origin.x) / denom;
    Ok((origin + direction * t).into())
}
