//! Kerf compensation
//!
//! Shifts each rail's polyline sideways inside its own plane so the wire's
//! finite width removes material on the intended side of the profile.
//!
//! Work happens per continuous run and per rail: every piece is offset on
//! its own, the joints between neighbouring pieces are repaired, and each
//! piece is resampled back to its original point count so the Left and
//! Right rails stay index-aligned.

use crate::route::{flatten, RouteItem, RunPiece};
use crate::segment::Movement;
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use foamcut_core::{
    GeometryError, Plane, Point3, RailPair, Rails, COMMON_POINT_TOLERANCE,
    STRAIGHT_LINE_TOLERANCE,
};
use foamcut_settings::{KerfDirection, KerfSettings, KerfStrategy, MachineConfig};
use nalgebra::Vector2;
use std::panic;
use tracing::{debug, warn};

/// Longest miter corner, as a multiple of the offset distance
const MITER_LIMIT: f64 = 4.0;
/// Turns sharper than this get a flat cap instead of a miter
const FLAT_CAP_COS: f64 = -0.98;
const EPSILON: f64 = 1e-9;
/// Relative source edge length difference that triggers the degree divisor
const EDGE_RATIO_THRESHOLD: f64 = 0.05;
/// Points per bulge when flattening an offset arc
const ARC_SEGMENTS: usize = 8;
/// Largest distance a rail sample may sit from its plane
const PLANE_TOLERANCE: f64 = 1e-6;

type Local = Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailSide {
    Left,
    Right,
}

/// Offset rails of a whole route
#[derive(Debug, Clone, Default)]
pub struct KerfOutput {
    /// `None` when the route has no movement samples
    pub rails: Option<RailPair>,
    pub warnings: Vec<String>,
}

/// How a junction between two offset pieces was repaired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Junction {
    Skipped,
    Coincident,
    Trimmed,
    Extended,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct KerfOffsetEngine {
    settings: KerfSettings,
}

impl KerfOffsetEngine {
    pub fn new(settings: KerfSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.kerf.clone())
    }

    pub fn is_active(&self) -> bool {
        self.settings.length > 0.0 && self.settings.strategy != KerfStrategy::None
    }

    /// Signed (left, right) offset distances for one movement.
    ///
    /// The movement's own direction wins over `default_direction`.
    pub fn offsets_for(&self, movement: &Movement, default_direction: KerfDirection) -> (f64, f64) {
        if !self.is_active() {
            return (0.0, 0.0);
        }
        let direction = movement.kerf_direction.unwrap_or(default_direction);
        let base = self.settings.length * direction.sign();
        if base == 0.0 || self.settings.strategy != KerfStrategy::Dynamic {
            return (base, base);
        }

        let left_edge = movement.left_edge_length;
        let right_edge = movement.right_edge_length;
        let mut left = scale_by_travel(base, left_edge, movement.left_segment_length());
        let mut right = scale_by_travel(base, right_edge, movement.right_segment_length());

        let longer = left_edge.max(right_edge);
        if longer > EPSILON && (left_edge - right_edge).abs() / longer > EDGE_RATIO_THRESHOLD {
            if left_edge < right_edge {
                left /= self.settings.degree;
            } else {
                right /= self.settings.degree;
            }
        }
        (left, right)
    }

    /// Offset every run of a laid-out route and flatten the result.
    pub(crate) fn offset_route(
        &self,
        items: &[RouteItem<'_>],
        rails: &Rails,
        default_direction: KerfDirection,
    ) -> Result<KerfOutput, GeometryError> {
        let mut warnings = Vec::new();
        let mut runs: Vec<Vec<RailPair>> = Vec::new();

        for item in items {
            if let RouteItem::Run(pieces) = item {
                runs.push(self.offset_run(pieces, rails, default_direction, &mut warnings)?);
            }
        }

        let refs: Vec<Vec<&RailPair>> = runs.iter().map(|run| run.iter().collect()).collect();
        let flat = flatten(items, &refs);
        let rails = if flat.left.is_empty() {
            None
        } else {
            Some(RailPair::new(flat.left, flat.right)?)
        };
        Ok(KerfOutput { rails, warnings })
    }

    fn offset_run(
        &self,
        pieces: &[RunPiece<'_>],
        rails: &Rails,
        default_direction: KerfDirection,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<RailPair>, GeometryError> {
        let offsets: Vec<(f64, f64)> = pieces
            .iter()
            .map(|p| self.offsets_for(p.movement, default_direction))
            .collect();
        let left_distances: Vec<f64> = offsets.iter().map(|o| o.0).collect();
        let right_distances: Vec<f64> = offsets.iter().map(|o| o.1).collect();

        let left = offset_side(pieces, &rails.left, RailSide::Left, &left_distances, warnings)?;
        let right = offset_side(pieces, &rails.right, RailSide::Right, &right_distances, warnings)?;

        left.into_iter()
            .zip(right)
            .map(|(l, r)| RailPair::new(l, r))
            .collect()
    }
}

fn scale_by_travel(base: f64, edge_length: f64, segment_length: f64) -> f64 {
    if edge_length > EPSILON && segment_length > EPSILON {
        base / (edge_length / segment_length)
    } else {
        base
    }
}

fn side_points(rails: &RailPair, side: RailSide) -> &[Point3] {
    match side {
        RailSide::Left => rails.left(),
        RailSide::Right => rails.right(),
    }
}

/// Offset, repair and resample all pieces of one run on one rail.
fn offset_side(
    pieces: &[RunPiece<'_>],
    plane: &Plane,
    side: RailSide,
    distances: &[f64],
    warnings: &mut Vec<String>,
) -> Result<Vec<Vec<Point3>>, GeometryError> {
    let mut sources: Vec<Vec<Local>> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let points = side_points(&piece.rails, side);
        if let Some(stray) = points.iter().find(|p| plane.distance_to(p) > PLANE_TOLERANCE) {
            return Err(GeometryError::OffsetFailed {
                segment: piece.movement.label.clone(),
                reason: format!("sample {} is off the rail plane x={:.3}", stray, plane.x),
            });
        }
        sources.push(points.iter().map(|p| to_local(plane, p)).collect());
    }

    let mut shapes = Vec::with_capacity(pieces.len());
    let mut modified = Vec::with_capacity(pieces.len());
    for ((piece, source), &distance) in pieces.iter().zip(&sources).zip(distances) {
        let (shape, warning) = offset_polyline(source, distance, &piece.movement.label);
        modified.push(distance != 0.0 && source.len() > 1);
        shapes.push(shape);
        warnings.extend(warning);
    }

    for i in 1..pieces.len() {
        let reach = MITER_LIMIT * distances[i - 1].abs().max(distances[i].abs());
        let (head, tail) = shapes.split_at_mut(i);
        match fix_junction(&mut head[i - 1], &mut tail[0], reach) {
            Junction::Skipped | Junction::Coincident => {}
            Junction::Trimmed | Junction::Extended => {
                modified[i - 1] = true;
                modified[i] = true;
            }
            Junction::Fallback => {
                modified[i - 1] = true;
                modified[i] = true;
                let message = format!(
                    "Kerf offsets of {} and {} do not meet on the {:?} rail, joined at their midpoint",
                    pieces[i - 1].movement.label,
                    pieces[i].movement.label,
                    side
                );
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    pieces
        .iter()
        .zip(sources.iter().zip(shapes))
        .zip(modified)
        .map(|((piece, (source, shape)), modified)| {
            let shape = if modified {
                resample(&shape, &arc_params(source))
            } else {
                shape
            };
            let points: Vec<Point3> = shape.iter().map(|p| plane.from_local(p.x, p.y)).collect();
            if points.iter().all(Point3::is_finite) {
                Ok(points)
            } else {
                Err(GeometryError::NonFinite {
                    context: format!("kerf offset of {}", piece.movement.label),
                })
            }
        })
        .collect()
}

fn to_local(plane: &Plane, p: &Point3) -> Local {
    let [u, v] = plane.to_local(p);
    Local::new(u, v)
}

fn left_normal(dir: &Local) -> Local {
    Local::new(-dir.y, dir.x)
}

fn local_length(points: &[Local]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

fn is_straight(points: &[Local], length: f64) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => length - (last - first).norm() <= STRAIGHT_LINE_TOLERANCE * length,
        _ => true,
    }
}

/// Offset one open polyline to the left of its direction of travel.
fn offset_polyline(points: &[Local], distance: f64, label: &str) -> (Vec<Local>, Option<String>) {
    if distance == 0.0 || points.len() < 2 {
        return (points.to_vec(), None);
    }
    let length = local_length(points);
    if length < EPSILON {
        return (points.to_vec(), None);
    }

    if is_straight(points, length) {
        let dir = (points[points.len() - 1] - points[0]) / length.max(EPSILON);
        let dir = dir.try_normalize(EPSILON).unwrap_or(dir);
        let shift = left_normal(&dir) * distance;
        return (points.iter().map(|p| p + shift).collect(), None);
    }

    match contour_offset(points, distance) {
        Some(shape) => (shape, None),
        None => {
            let message = format!("Kerf offset of {} fell back to mitered corners", label);
            warn!("{}", message);
            (miter_offset(points, distance), Some(message))
        }
    }
}

/// Planar offset of a curved piece through cavalier_contours.
///
/// Only a single, unbroken result whose start lies next to the expected
/// start point is accepted.
fn contour_offset(points: &[Local], distance: f64) -> Option<Vec<Local>> {
    let mut pline = Polyline::new();
    for p in points {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.remove_repeat_pos(1e-5);
    if pline.vertex_count() < 2 {
        return None;
    }

    let first_dir = points
        .windows(2)
        .find_map(|w| (w[1] - w[0]).try_normalize(EPSILON))?;
    let expected_start = points[0] + left_normal(&first_dir) * distance;

    for candidate in [distance, -distance] {
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(candidate)));
        let mut offsets = match result {
            Ok(offsets) => offsets,
            Err(_) => {
                warn!("Panic during parallel offset of kerf polyline");
                return None;
            }
        };
        if offsets.len() != 1 {
            debug!("Parallel offset produced {} pieces", offsets.len());
            return None;
        }
        let shape = pline_points(&offsets.remove(0));
        if let Some(start) = shape.first() {
            if (start - expected_start).norm() <= distance.abs() {
                return Some(shape);
            }
        }
    }
    None
}

/// Flatten a bulged polyline into points, approximating each arc.
fn pline_points(pline: &Polyline<f64>) -> Vec<Local> {
    let count = pline.vertex_count();
    let mut points = Vec::with_capacity(count * ARC_SEGMENTS);

    for i in 0..count {
        let v1 = pline.at(i);
        points.push(Local::new(v1.x, v1.y));
        if i + 1 == count || v1.bulge.abs() <= 1e-5 {
            continue;
        }

        let v2 = pline.at(i + 1);
        let theta = 4.0 * v1.bulge.atan();
        let chord = Local::new(v2.x - v1.x, v2.y - v1.y);
        let chord_len = chord.norm();
        if chord_len <= 1e-5 {
            continue;
        }
        let radius = chord_len / (2.0 * (theta / 2.0).sin());
        let dist_to_center = radius.abs() * (theta.abs() / 2.0).cos();
        let mid = Local::new((v1.x + v2.x) / 2.0, (v1.y + v2.y) / 2.0);
        let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
        let center = mid + left_normal(&(chord / chord_len)) * (dist_to_center * sign);

        let start_angle = (v1.y - center.y).atan2(v1.x - center.x);
        let mut end_angle = (v2.y - center.y).atan2(v2.x - center.x);
        if v1.bulge > 0.0 {
            if end_angle <= start_angle {
                end_angle += 2.0 * std::f64::consts::PI;
            }
        } else if end_angle >= start_angle {
            end_angle -= 2.0 * std::f64::consts::PI;
        }
        for j in 1..ARC_SEGMENTS {
            let t = j as f64 / ARC_SEGMENTS as f64;
            let angle = start_angle + (end_angle - start_angle) * t;
            points.push(center + Local::new(angle.cos(), angle.sin()) * radius.abs());
        }
    }
    points
}

/// Segment-by-segment offset with mitered corners.
fn miter_offset(points: &[Local], distance: f64) -> Vec<Local> {
    let mut clean: Vec<Local> = Vec::with_capacity(points.len());
    for p in points {
        if clean.last().is_none_or(|q: &Local| (p - q).norm() > EPSILON) {
            clean.push(*p);
        }
    }
    if clean.len() < 2 {
        return points.to_vec();
    }

    let mut segments = Vec::with_capacity(clean.len() - 1);
    let mut directions = Vec::with_capacity(clean.len() - 1);
    for w in clean.windows(2) {
        let dir = (w[1] - w[0]).normalize();
        let shift = left_normal(&dir) * distance;
        segments.push((w[0] + shift, w[1] + shift));
        directions.push(dir);
    }

    let mut raw = Vec::with_capacity(clean.len() * 2);
    raw.push(segments[0].0);
    for i in 1..segments.len() {
        push_corner(
            &mut raw,
            &segments[i - 1],
            &segments[i],
            &directions[i - 1],
            &directions[i],
            &clean[i],
            distance,
        );
    }
    raw.push(segments[segments.len() - 1].1);
    raw
}

fn push_corner(
    raw: &mut Vec<Local>,
    seg_prev: &(Local, Local),
    seg_next: &(Local, Local),
    dir_prev: &Local,
    dir_next: &Local,
    original_corner: &Local,
    distance: f64,
) {
    if dir_prev.dot(dir_next) < FLAT_CAP_COS {
        raw.push(seg_prev.1);
        raw.push(seg_next.0);
        return;
    }

    let corner = match line_line_intersect(&seg_prev.1, dir_prev, &seg_next.0, dir_next) {
        Some((t, _)) => seg_prev.1 + dir_prev * t,
        None => original_corner + left_normal(dir_prev) * distance,
    };
    if (corner - original_corner).norm() > MITER_LIMIT * distance.abs() {
        raw.push(seg_prev.1);
        raw.push(seg_next.0);
    } else {
        raw.push(corner);
    }
}

/// Lines `p1 + t * d1` and `p2 + u * d2`; `None` when parallel.
fn line_line_intersect(p1: &Local, d1: &Local, p2: &Local, d2: &Local) -> Option<(f64, f64)> {
    let cross = d1.perp(d2);
    if cross.abs() < EPSILON {
        return None;
    }
    let delta = p2 - p1;
    Some((delta.perp(d2) / cross, delta.perp(d1) / cross))
}

fn segment_segment_intersect(a0: &Local, a1: &Local, b0: &Local, b1: &Local) -> Option<Local> {
    let da = a1 - a0;
    let db = b1 - b0;
    let (t, u) = line_line_intersect(a0, &da, b0, &db)?;
    let range = -EPSILON..=1.0 + EPSILON;
    if range.contains(&t) && range.contains(&u) {
        Some(a0 + da * t.clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Crossing between the tail of `a` and the head of `b` within `reach`
/// of the junction, as (segment of a, segment of b, point).
fn find_crossing(a: &[Local], b: &[Local], reach: f64) -> Option<(usize, usize, Local)> {
    let mut a_walked = 0.0;
    for ia in (0..a.len() - 1).rev() {
        let mut b_walked = 0.0;
        for jb in 0..b.len() - 1 {
            if let Some(p) = segment_segment_intersect(&a[ia], &a[ia + 1], &b[jb], &b[jb + 1]) {
                return Some((ia, jb, p));
            }
            b_walked += (b[jb + 1] - b[jb]).norm();
            if b_walked > reach {
                break;
            }
        }
        a_walked += (a[ia + 1] - a[ia]).norm();
        if a_walked > reach {
            break;
        }
    }
    None
}

/// Make the end of `a` and the start of `b` meet.
fn fix_junction(a: &mut Vec<Local>, b: &mut Vec<Local>, reach: f64) -> Junction {
    if a.len() < 2 || b.len() < 2 {
        return Junction::Skipped;
    }
    let a_end = a[a.len() - 1];
    let b_start = b[0];
    let gap = (a_end - b_start).norm();
    if gap <= COMMON_POINT_TOLERANCE {
        return Junction::Coincident;
    }
    let reach = reach + gap;

    if let Some((ia, jb, p)) = find_crossing(a, b, reach) {
        a.truncate(ia + 1);
        a.push(p);
        b.drain(..=jb);
        b.insert(0, p);
        return Junction::Trimmed;
    }

    let da = a_end - a[a.len() - 2];
    let db = b[1] - b_start;
    if let Some((t, u)) = line_line_intersect(&a_end, &da, &b_start, &db) {
        let p = a_end + da * t;
        if t >= -EPSILON && u <= EPSILON && (p - a_end).norm() <= reach && (p - b_start).norm() <= reach {
            a.push(p);
            b.insert(0, p);
            return Junction::Extended;
        }
    }

    let mid = (a_end + b_start) / 2.0;
    a.push(mid);
    b.insert(0, mid);
    Junction::Fallback
}

/// Normalized arc-length parameter of every point.
fn arc_params(points: &[Local]) -> Vec<f64> {
    let n = points.len();
    let total = local_length(points);
    if total < EPSILON {
        return (0..n)
            .map(|i| if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 })
            .collect();
    }
    let mut walked = 0.0;
    let mut params = Vec::with_capacity(n);
    params.push(0.0);
    for w in points.windows(2) {
        walked += (w[1] - w[0]).norm();
        params.push(walked / total);
    }
    params
}

/// Evaluate `shape` at normalized arc-length parameters.
fn resample(shape: &[Local], params: &[f64]) -> Vec<Local> {
    let (Some(first), Some(last)) = (shape.first(), shape.last()) else {
        return Vec::new();
    };
    let total = local_length(shape);
    if total < EPSILON || shape.len() < 2 {
        return vec![*first; params.len()];
    }

    let mut out = Vec::with_capacity(params.len());
    let mut segment = 0;
    let mut walked = 0.0;
    for &t in params {
        if t <= 0.0 {
            out.push(*first);
            continue;
        }
        if t >= 1.0 {
            out.push(*last);
            continue;
        }
        let target = t * total;
        while segment < shape.len() - 2 && walked + (shape[segment + 1] - shape[segment]).norm() < target {
            walked += (shape[segment + 1] - shape[segment]).norm();
            segment += 1;
        }
        let len = (shape[segment + 1] - shape[segment]).norm();
        let local_t = if len < EPSILON {
            0.0
        } else {
            ((target - walked) / len).clamp(0.0, 1.0)
        };
        out.push(shape[segment].lerp(&shape[segment + 1], local_t));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Local> {
        coords.iter().map(|&(u, v)| Local::new(u, v)).collect()
    }

    #[test]
    fn test_straight_offset_goes_left() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let (shape, warning) = offset_polyline(&line, 1.0, "Line");
        assert!(warning.is_none());
        assert!((shape[0] - Local::new(0.0, 1.0)).norm() < 1e-12);
        assert!((shape[1] - Local::new(10.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_zero_distance_keeps_points() {
        let line = pts(&[(0.0, 0.0), (3.0, 4.0), (5.0, 0.0)]);
        let (shape, _) = offset_polyline(&line, 0.0, "Line");
        assert_eq!(shape, line);
    }

    #[test]
    fn test_miter_corner() {
        let l_shape = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let shape = miter_offset(&l_shape, -1.0);
        assert_eq!(shape.len(), 3);
        assert!((shape[1] - Local::new(11.0, -1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_junction_trims_crossing() {
        let mut a = pts(&[(0.0, 1.0), (11.0, 1.0)]);
        let mut b = pts(&[(9.0, -1.0), (9.0, 10.0)]);
        assert_eq!(fix_junction(&mut a, &mut b, 4.0), Junction::Trimmed);
        assert!((a[a.len() - 1] - Local::new(9.0, 1.0)).norm() < 1e-9);
        assert_eq!(a[a.len() - 1], b[0]);
    }

    #[test]
    fn test_junction_extends_gap() {
        let mut a = pts(&[(0.0, -1.0), (10.0, -1.0)]);
        let mut b = pts(&[(11.0, 0.0), (11.0, 10.0)]);
        assert_eq!(fix_junction(&mut a, &mut b, 4.0), Junction::Extended);
        assert!((b[0] - Local::new(11.0, -1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_junction_parallel_falls_back_to_midpoint() {
        let mut a = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let mut b = pts(&[(10.0, 2.0), (20.0, 2.0)]);
        assert_eq!(fix_junction(&mut a, &mut b, 4.0), Junction::Fallback);
        assert!((b[0] - Local::new(10.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_resample_preserves_count() {
        let source = pts(&[(0.0, 0.0), (1.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let shape = pts(&[(0.0, 1.0), (8.0, 1.0)]);
        let out = resample(&shape, &arc_params(&source));
        assert_eq!(out.len(), 4);
        assert!((out[1] - Local::new(2.0, 1.0)).norm() < 1e-9);
        assert!((out[2] - Local::new(6.0, 1.0)).norm() < 1e-9);
        assert_eq!(out[3], Local::new(8.0, 1.0));
    }

    #[test]
    fn test_curved_offset_keeps_side() {
        // Quarter circle of radius 10 around the origin, counter-clockwise.
        let arc: Vec<Local> = (0..=16)
            .map(|i| {
                let a = std::f64::consts::FRAC_PI_2 * i as f64 / 16.0;
                Local::new(10.0 * a.cos(), 10.0 * a.sin())
            })
            .collect();
        let (shape, _) = offset_polyline(&arc, 1.0, "Arc");
        // Left of counter-clockwise travel is the center.
        for p in &shape {
            assert!(p.norm() < 9.5, "point {:?} not inside the arc", p);
        }
    }
}
