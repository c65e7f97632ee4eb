//! Dual-rail projection
//!
//! Turns one or two source edges into matched Left/Right rail samples. With
//! two edges, every rung is the line through the i-th sample of each edge,
//! extended until it meets both rail planes. A single edge is projected
//! straight onto both rails.

use foamcut_core::{
    are_coplanar, intersect_line_plane, sample_count, synchronize_endpoints, Edge,
    GeometryError, Point3, RailPair, Rails,
};
use foamcut_settings::MachineConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How samples of the second edge are paired with the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Pairing {
    /// Pick the pairing with the shorter total rung length
    #[default]
    Auto,
    /// Pair each edge's samples in the edge's own first-to-last order,
    /// without endpoint synchronization
    Direct,
    /// Force the second edge to run backwards
    Inverted,
}

/// Result of projecting source geometry onto the rails.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub rails: RailPair,
    /// Second edge's samples were paired in reverse
    pub inverted: bool,
    /// Source edge length feeding the left rail
    pub left_edge_length: f64,
    /// Source edge length feeding the right rail
    pub right_edge_length: f64,
}

impl Projection {
    pub fn point_count(&self) -> usize {
        self.rails.point_count()
    }
}

/// Projects source edges onto a pair of rails.
#[derive(Debug, Clone, Copy)]
pub struct DualRailProjector {
    rails: Rails,
    step: f64,
}

impl DualRailProjector {
    pub fn new(rails: Rails, step: f64) -> Self {
        Self { rails, step }
    }

    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.rails(), config.travel.discretization_step)
    }

    pub fn rails(&self) -> &Rails {
        &self.rails
    }

    /// Project two edges with automatic pairing.
    pub fn project_pair(&self, first: &Edge, second: &Edge) -> Result<Projection, GeometryError> {
        self.project_pair_with(first, second, Pairing::Auto)
    }

    pub fn project_pair_with(
        &self,
        first: &Edge,
        second: &Edge,
        pairing: Pairing,
    ) -> Result<Projection, GeometryError> {
        first.validate()?;
        second.validate()?;

        let (left_edge_length, right_edge_length) = side_lengths(first, second);

        if first.is_vertex() && second.is_vertex() {
            let rails = self.rungs(&[first.first()], &[second.first()])?;
            return Ok(Projection {
                rails,
                inverted: false,
                left_edge_length,
                right_edge_length,
            });
        }

        let (set_a, set_b) = self.sample_sets(first, second, pairing);

        let direct = self.rungs(&set_a, &set_b)?;
        let can_invert = set_a.len() > 1 && !first.is_vertex() && !second.is_vertex();

        let (rails, inverted) = match pairing {
            Pairing::Direct => (direct, false),
            _ if !can_invert => (direct, false),
            Pairing::Inverted => {
                let reversed: Vec<Point3> = set_b.iter().rev().copied().collect();
                (self.rungs(&set_a, &reversed)?, true)
            }
            Pairing::Auto => {
                let reversed: Vec<Point3> = set_b.iter().rev().copied().collect();
                let inverted_rails = self.rungs(&set_a, &reversed)?;
                let direct_total: f64 = direct.rung_lengths().iter().sum();
                let inverted_total: f64 = inverted_rails.rung_lengths().iter().sum();
                if inverted_total < direct_total {
                    debug!(
                        "Inverted pairing is shorter ({:.3} < {:.3})",
                        inverted_total, direct_total
                    );
                    (inverted_rails, true)
                } else {
                    (direct, false)
                }
            }
        };

        Ok(Projection {
            rails,
            inverted,
            left_edge_length,
            right_edge_length,
        })
    }

    /// Project a single edge orthogonally onto both rails.
    pub fn project_single(&self, edge: &Edge) -> Result<Projection, GeometryError> {
        edge.validate()?;
        let samples = edge.discretize(self.step);
        let left = samples.iter().map(|p| self.rails.left.project(p)).collect();
        let right = samples.iter().map(|p| self.rails.right.project(p)).collect();
        let length = edge.length();
        Ok(Projection {
            rails: RailPair::new(left, right)?,
            inverted: false,
            left_edge_length: length,
            right_edge_length: length,
        })
    }

    /// Equal-length sample sets for a two-edge projection.
    fn sample_sets(&self, first: &Edge, second: &Edge, pairing: Pairing) -> (Vec<Point3>, Vec<Point3>) {
        let simple = |e: &Edge| e.is_vertex() || e.is_straight_line();
        let count = sample_count(first.length().max(second.length()), self.step);

        if (simple(first) && simple(second)) || count < 2 || are_coplanar(first, second) {
            return endpoint_sets(first, second, pairing == Pairing::Direct);
        }

        let sample = |e: &Edge| {
            if e.is_vertex() {
                vec![e.first(); count]
            } else {
                e.discretize_count(count)
            }
        };
        (sample(first), sample(second))
    }

    fn rungs(&self, set_a: &[Point3], set_b: &[Point3]) -> Result<RailPair, GeometryError> {
        let mut left = Vec::with_capacity(set_a.len());
        let mut right = Vec::with_capacity(set_a.len());
        for (a, b) in set_a.iter().zip(set_b.iter()) {
            left.push(intersect_line_plane(a, b, &self.rails.left)?);
            right.push(intersect_line_plane(a, b, &self.rails.right)?);
        }
        RailPair::new(left, right)
    }
}

/// Endpoint pairs of two edges. Unless `keep_order` is set, each pair of
/// nearest endpoints is matched first.
fn endpoint_sets(first: &Edge, second: &Edge, keep_order: bool) -> (Vec<Point3>, Vec<Point3>) {
    match (first.is_vertex(), second.is_vertex()) {
        (true, _) => (
            vec![first.first(), first.first()],
            vec![second.first(), second.last()],
        ),
        (_, true) => (
            vec![first.first(), first.last()],
            vec![second.first(), second.first()],
        ),
        _ if keep_order => (
            vec![first.first(), first.last()],
            vec![second.first(), second.last()],
        ),
        _ => {
            let synced = synchronize_endpoints(first, second);
            (
                vec![synced.a_first, synced.a_last],
                vec![synced.b_first, synced.b_last],
            )
        }
    }
}

/// Edge lengths ordered (left, right) by which edge sits nearer the left rail.
fn side_lengths(first: &Edge, second: &Edge) -> (f64, f64) {
    let mean_x = |e: &Edge| (e.first().x + e.last().x) / 2.0;
    if mean_x(first) <= mean_x(second) {
        (first.length(), second.length())
    } else {
        (second.length(), first.length())
    }
}
