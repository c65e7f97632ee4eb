//! Toolpath segments
//!
//! A segment is the atomic element of a route. Every kind except
//! [`Segment::Rotation`] carries a matched rail pair computed from source
//! geometry. Segments are plain values: when the source geometry or the
//! machine configuration changes they are rebuilt, never patched.

use crate::projector::{DualRailProjector, Pairing, Projection};
use foamcut_core::{Edge, GeometryError, Point3, RailPair};
use foamcut_settings::KerfDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Path,
    Projection,
    Move,
    Join,
    Enter,
    Exit,
    Rotation,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "Path",
            Self::Projection => "Projection",
            Self::Move => "Move",
            Self::Join => "Join",
            Self::Enter => "Enter",
            Self::Exit => "Exit",
            Self::Rotation => "Rotation",
        };
        write!(f, "{}", name)
    }
}

/// Kinds that own a rail pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Path,
    Projection,
    Move,
    Join,
    Enter,
    Exit,
}

impl From<MovementKind> for SegmentKind {
    fn from(kind: MovementKind) -> Self {
        match kind {
            MovementKind::Path => SegmentKind::Path,
            MovementKind::Projection => SegmentKind::Projection,
            MovementKind::Move => SegmentKind::Move,
            MovementKind::Join => SegmentKind::Join,
            MovementKind::Enter => SegmentKind::Enter,
            MovementKind::Exit => SegmentKind::Exit,
        }
    }
}

/// A point a synthetic segment starts or ends at.
///
/// `opposite` is the matching point on the other side of the part. Without
/// it the segment is built from one line and projected onto both rails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub point: Point3,
    #[serde(default)]
    pub opposite: Option<Point3>,
}

impl Anchor {
    pub fn single(point: Point3) -> Self {
        Self {
            point,
            opposite: None,
        }
    }

    pub fn paired(point: Point3, opposite: Point3) -> Self {
        Self {
            point,
            opposite: Some(opposite),
        }
    }

    /// Anchor at one end of an existing segment's rails.
    pub fn at_segment_end(segment: &Segment, end: SegmentEnd) -> Option<Self> {
        let rails = segment.rails()?;
        let (left, right) = match end {
            SegmentEnd::First => rails.first_rung(),
            SegmentEnd::Last => rails.last_rung(),
        };
        Some(Self::paired(left, right))
    }

    pub fn translated(&self, dy: f64, dz: f64) -> Self {
        let shift = Point3::new(0.0, dy, dz);
        Self {
            point: self.point + shift,
            opposite: self.opposite.map(|p| p + shift),
        }
    }

    fn opposite_or_self(&self) -> Point3 {
        self.opposite.unwrap_or(self.point)
    }

    fn at_height(&self, z: f64) -> Self {
        let lift = |p: Point3| Point3::new(p.x, p.y, z);
        Self {
            point: lift(self.point),
            opposite: self.opposite.map(lift),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentEnd {
    First,
    Last,
}

/// Segment with a rail pair
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub label: String,
    pub kind: MovementKind,
    pub rails: RailPair,
    pub inverted: bool,
    pub left_edge_length: f64,
    pub right_edge_length: f64,
    /// Dwell after the last point, in seconds
    pub pause: Option<f64>,
    /// Overrides the route's kerf direction
    pub kerf_direction: Option<KerfDirection>,
}

impl Movement {
    fn from_projection(label: &str, kind: MovementKind, projection: Projection) -> Self {
        Self {
            label: label.to_string(),
            kind,
            rails: projection.rails,
            inverted: projection.inverted,
            left_edge_length: projection.left_edge_length,
            right_edge_length: projection.right_edge_length,
            pause: None,
            kerf_direction: None,
        }
    }

    pub fn point_count(&self) -> usize {
        self.rails.point_count()
    }

    pub fn left_segment_length(&self) -> f64 {
        self.rails.left_length()
    }

    pub fn right_segment_length(&self) -> f64 {
        self.rails.right_length()
    }
}

/// Turn of the rotary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub label: String,
    /// Absolute table angle in degrees
    pub angle: f64,
    /// Label of the shape being rotated
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Movement(Movement),
    Rotation(Rotation),
}

impl Segment {
    /// Path between two source edges, one per side of the part.
    pub fn path(
        label: &str,
        first: &Edge,
        second: &Edge,
        pairing: Pairing,
        projector: &DualRailProjector,
    ) -> Result<Segment, GeometryError> {
        let projection = projector.project_pair_with(first, second, pairing)?;
        Ok(Segment::Movement(Movement::from_projection(
            label,
            MovementKind::Path,
            projection,
        )))
    }

    /// Single edge projected straight onto both rails.
    pub fn projection(
        label: &str,
        edge: &Edge,
        projector: &DualRailProjector,
    ) -> Result<Segment, GeometryError> {
        let projection = projector.project_single(edge)?;
        Ok(Segment::Movement(Movement::from_projection(
            label,
            MovementKind::Projection,
            projection,
        )))
    }

    /// Straight move from `start` by `(dy, dz)` in the carriage plane.
    pub fn move_by(
        label: &str,
        start: &Anchor,
        dy: f64,
        dz: f64,
        projector: &DualRailProjector,
    ) -> Result<Segment, GeometryError> {
        let end = start.translated(dy, dz);
        straight(label, MovementKind::Move, start, &end, projector)
    }

    /// Straight connection between two anchors.
    pub fn join(
        label: &str,
        start: &Anchor,
        end: &Anchor,
        projector: &DualRailProjector,
    ) -> Result<Segment, GeometryError> {
        straight(label, MovementKind::Join, start, end, projector)
    }

    /// Vertical lead-in from `safe_height` down to the anchor.
    pub fn enter(
        label: &str,
        anchor: &Anchor,
        safe_height: f64,
        projector: &DualRailProjector,
    ) -> Result<Segment, GeometryError> {
        let top = anchor.at_height(safe_height);
        straight(label, MovementKind::Enter, &top, anchor, projector)
    }

    /// Vertical lead-out from the anchor up to `safe_height`.
    pub fn exit(
        label: &str,
        anchor: &Anchor,
        safe_height: f64,
        projector: &DualRailProjector,
    ) -> Result<Segment, GeometryError> {
        let top = anchor.at_height(safe_height);
        straight(label, MovementKind::Exit, anchor, &top, projector)
    }

    pub fn rotation(label: &str, angle: f64, reference: &str) -> Segment {
        Segment::Rotation(Rotation {
            label: label.to_string(),
            angle,
            reference: reference.to_string(),
        })
    }

    pub fn with_pause(mut self, duration: Option<f64>) -> Self {
        if let Segment::Movement(m) = &mut self {
            m.pause = duration;
        }
        self
    }

    pub fn with_kerf_direction(mut self, direction: Option<KerfDirection>) -> Self {
        if let Segment::Movement(m) = &mut self {
            m.kerf_direction = direction;
        }
        self
    }

    pub fn label(&self) -> &str {
        match self {
            Segment::Movement(m) => &m.label,
            Segment::Rotation(r) => &r.label,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Movement(m) => m.kind.into(),
            Segment::Rotation(_) => SegmentKind::Rotation,
        }
    }

    pub fn rails(&self) -> Option<&RailPair> {
        match self {
            Segment::Movement(m) => Some(&m.rails),
            Segment::Rotation(_) => None,
        }
    }

    pub fn movement(&self) -> Option<&Movement> {
        match self {
            Segment::Movement(m) => Some(m),
            Segment::Rotation(_) => None,
        }
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self, Segment::Rotation(_))
    }
}

fn straight(
    label: &str,
    kind: MovementKind,
    start: &Anchor,
    end: &Anchor,
    projector: &DualRailProjector,
) -> Result<Segment, GeometryError> {
    let line = Edge::line(start.point, end.point);
    let projection = if start.opposite.is_none() && end.opposite.is_none() {
        projector.project_single(&line)?
    } else {
        let partner = Edge::line(start.opposite_or_self(), end.opposite_or_self());
        projector.project_pair_with(&line, &partner, Pairing::Direct)?
    };
    Ok(Segment::Movement(Movement::from_projection(
        label, kind, projection,
    )))
}
