//! Route assembly
//!
//! A route is an operator-ordered list of segments turned into one
//! continuous, direction-resolved cut. Assembly walks consecutive pairs,
//! decides which way each segment is traversed, and stops at the first
//! pair that does not connect.
//!
//! Continuity breaks at rotations and after exits. Points that two
//! connected segments share appear once in the flattened rails; only an
//! Exit -> Enter boundary keeps both.

use crate::kerf::KerfOffsetEngine;
use crate::segment::{Movement, MovementKind, Segment, SegmentKind};
use crate::wire_stretch::WireStretchValidator;
use foamcut_core::{ConnectivityError, Point3, RailPair, COMMON_POINT_TOLERANCE};
use foamcut_settings::{KerfDirection, MachineConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One resolved step of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Index into the route's segment list
    pub index: usize,
    /// Segment samples are traversed back to front
    pub reversed: bool,
}

/// Slice of the flattened rails owned by one route entry
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpan {
    /// Position in the route's entry list
    pub position: usize,
    /// Index into the route's segment list
    pub index: usize,
    pub kind: SegmentKind,
    /// First flattened index (inclusive)
    pub start: usize,
    /// Last flattened index (exclusive)
    pub end: usize,
    /// First sample was kept: route start, after a rotation, or re-entry
    pub run_start: bool,
}

impl SegmentSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Dwell requested after a flattened index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PauseMark {
    pub index: usize,
    /// Seconds
    pub duration: f64,
}

/// Orders and orients segments into a continuous route.
#[derive(Debug, Clone, Copy)]
pub struct RouteAssembler {
    tolerance: f64,
}

impl Default for RouteAssembler {
    fn default() -> Self {
        Self {
            tolerance: COMMON_POINT_TOLERANCE,
        }
    }
}

impl RouteAssembler {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Resolve traversal direction for every segment.
    ///
    /// The first connected pair after the route start or a break may flip
    /// either segment. Later segments must continue from the trailing end
    /// already fixed for their predecessor.
    pub fn assemble(
        &self,
        route: &str,
        segments: &[Segment],
    ) -> Result<Vec<RouteEntry>, ConnectivityError> {
        if segments.is_empty() {
            return Err(ConnectivityError::EmptyRoute {
                route: route.to_string(),
            });
        }

        let mut directions: Vec<Option<bool>> = vec![None; segments.len()];

        for i in 1..segments.len() {
            let (prev, curr) = (&segments[i - 1], &segments[i]);
            match (prev, curr) {
                (_, Segment::Rotation(_)) => {
                    directions[i - 1].get_or_insert(false);
                    directions[i] = Some(false);
                    debug!("Route {}: break at rotation {}", route, curr.label());
                }
                (Segment::Rotation(_), _) => {}
                (Segment::Movement(p), Segment::Movement(c))
                    if p.kind == MovementKind::Exit && c.kind == MovementKind::Enter =>
                {
                    directions[i - 1].get_or_insert(false);
                    directions[i] = Some(false);
                    debug!("Route {}: re-entry at {}", route, c.label);
                }
                (Segment::Movement(p), Segment::Movement(c)) => {
                    let (prev_reversed, curr_reversed) = match directions[i - 1] {
                        Some(prev_reversed) => {
                            let curr_reversed = self
                                .continue_from(p, prev_reversed, c)
                                .ok_or_else(|| not_connected(p, c))?;
                            (prev_reversed, curr_reversed)
                        }
                        None => self.first_pair(p, c).ok_or_else(|| not_connected(p, c))?,
                    };
                    directions[i - 1] = Some(prev_reversed);
                    directions[i] = Some(curr_reversed);
                }
            }
        }

        Ok(directions
            .into_iter()
            .enumerate()
            .map(|(index, reversed)| RouteEntry {
                index,
                reversed: reversed.unwrap_or(false),
            })
            .collect())
    }

    /// Direction of `curr` given the fixed direction of `prev`.
    fn continue_from(&self, prev: &Movement, prev_reversed: bool, curr: &Movement) -> Option<bool> {
        let (prev_first, prev_last) = line_ends(prev);
        let (curr_first, curr_last) = line_ends(curr);
        let trailing = if prev_reversed { prev_first } else { prev_last };

        if trailing.is_equal(&curr_first, self.tolerance) {
            Some(false)
        } else if trailing.is_equal(&curr_last, self.tolerance) {
            Some(true)
        } else {
            None
        }
    }

    /// Directions of the first connected pair. Keeping both segments as
    /// stored wins over flipping when several endpoint pairs match.
    fn first_pair(&self, prev: &Movement, curr: &Movement) -> Option<(bool, bool)> {
        let (prev_first, prev_last) = line_ends(prev);
        let (curr_first, curr_last) = line_ends(curr);

        let candidates = [
            (prev_last, curr_first, (false, false)),
            (prev_last, curr_last, (false, true)),
            (prev_first, curr_first, (true, false)),
            (prev_first, curr_last, (true, true)),
        ];
        candidates
            .iter()
            .find(|(a, b, _)| a.is_equal(b, self.tolerance))
            .map(|(_, _, directions)| *directions)
    }
}

/// Endpoints of the left rail. The right rail follows rigidly.
fn line_ends(movement: &Movement) -> (Point3, Point3) {
    let (first, _) = movement.rails.first_rung();
    let (last, _) = movement.rails.last_rung();
    (first, last)
}

fn not_connected(prev: &Movement, curr: &Movement) -> ConnectivityError {
    ConnectivityError::NotConnected {
        from: prev.label.clone(),
        to: curr.label.clone(),
    }
}

/// A movement in traversal order, as laid out inside a continuous run
#[derive(Debug, Clone)]
pub(crate) struct RunPiece<'a> {
    pub position: usize,
    pub index: usize,
    pub movement: &'a Movement,
    /// Samples in traversal order
    pub rails: RailPair,
    /// Shares its first sample with the previous piece
    pub joined: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum RouteItem<'a> {
    Rotation { position: usize, index: usize },
    Run(Vec<RunPiece<'a>>),
}

/// Group resolved entries into rotations and continuous runs. Runs end at
/// every rotation and after every Exit.
pub(crate) fn layout<'a>(segments: &'a [Segment], entries: &[RouteEntry]) -> Vec<RouteItem<'a>> {
    let mut items = Vec::new();
    let mut run: Vec<RunPiece<'a>> = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        match &segments[entry.index] {
            Segment::Rotation(_) => {
                if !run.is_empty() {
                    items.push(RouteItem::Run(std::mem::take(&mut run)));
                }
                items.push(RouteItem::Rotation {
                    position,
                    index: entry.index,
                });
            }
            Segment::Movement(movement) => {
                // A new run starts after every Exit. Only an Enter after an
                // Exit keeps its first sample; anything else continues from
                // the Exit's top point and shares it.
                let after_exit = run
                    .last()
                    .is_some_and(|p| p.movement.kind == MovementKind::Exit);
                let joined = !run.is_empty() && !(after_exit && movement.kind == MovementKind::Enter);
                if after_exit {
                    items.push(RouteItem::Run(std::mem::take(&mut run)));
                }
                let rails = if entry.reversed {
                    movement.rails.reversed()
                } else {
                    movement.rails.clone()
                };
                run.push(RunPiece {
                    position,
                    index: entry.index,
                    movement,
                    rails,
                    joined,
                });
            }
        }
    }
    if !run.is_empty() {
        items.push(RouteItem::Run(run));
    }
    items
}

/// Concatenated route geometry plus the per-entry bookkeeping
#[derive(Debug, Clone, Default)]
pub(crate) struct Flattened {
    pub left: Vec<Point3>,
    pub right: Vec<Point3>,
    pub spans: Vec<SegmentSpan>,
    pub breaks: Vec<usize>,
    pub pauses: Vec<PauseMark>,
}

/// Concatenate the pieces of every run, dropping joined first samples.
///
/// `runs[r][p]` supplies the samples of piece `p` in run `r`, so the same
/// walk serves both the source and the kerf-offset geometry.
pub(crate) fn flatten(items: &[RouteItem<'_>], runs: &[Vec<&RailPair>]) -> Flattened {
    let mut out = Flattened::default();
    let mut run_index = 0;

    for item in items {
        match item {
            RouteItem::Rotation { position, index } => {
                let at = out.left.len();
                if at > 0 && out.breaks.last() != Some(&at) {
                    out.breaks.push(at);
                }
                out.spans.push(SegmentSpan {
                    position: *position,
                    index: *index,
                    kind: SegmentKind::Rotation,
                    start: at,
                    end: at,
                    run_start: true,
                });
            }
            RouteItem::Run(pieces) => {
                let at = out.left.len();
                if at > 0 && out.breaks.last() != Some(&at) {
                    out.breaks.push(at);
                }
                for (piece_index, piece) in pieces.iter().enumerate() {
                    let rails = runs[run_index][piece_index];
                    let skip = usize::from(piece.joined);
                    let start = out.left.len();
                    out.left.extend(rails.left().iter().skip(skip));
                    out.right.extend(rails.right().iter().skip(skip));
                    let end = out.left.len();

                    out.spans.push(SegmentSpan {
                        position: piece.position,
                        index: piece.index,
                        kind: piece.movement.kind.into(),
                        start,
                        end,
                        run_start: !piece.joined,
                    });
                    if let (Some(duration), true) = (piece.movement.pause, end > 0) {
                        out.pauses.push(PauseMark {
                            index: end - 1,
                            duration,
                        });
                    }
                }
                run_index += 1;
            }
        }
    }
    out
}

/// A grouped, direction-resolved list of segments
#[derive(Debug, Clone)]
pub struct Route {
    pub label: String,
    segments: Vec<Segment>,
    kerf_direction: KerfDirection,
    entries: Vec<RouteEntry>,
    path: Option<RailPair>,
    offset: Option<RailPair>,
    spans: Vec<SegmentSpan>,
    breaks: Vec<usize>,
    pauses: Vec<PauseMark>,
    error: String,
    warnings: Vec<String>,
}

impl Route {
    /// Group segments into a route and compute it.
    pub fn group(
        label: &str,
        segments: Vec<Segment>,
        kerf_direction: KerfDirection,
        config: &MachineConfig,
    ) -> Route {
        let mut route = Route {
            label: label.to_string(),
            segments,
            kerf_direction,
            entries: Vec::new(),
            path: None,
            offset: None,
            spans: Vec::new(),
            breaks: Vec::new(),
            pauses: Vec::new(),
            error: String::new(),
            warnings: Vec::new(),
        };
        route.recompute(config);
        route
    }

    /// A route that cannot be computed, carrying `error` instead of rails.
    pub fn rejected(
        label: &str,
        segments: Vec<Segment>,
        kerf_direction: KerfDirection,
        error: String,
    ) -> Route {
        warn!("Route {}: {}", label, error);
        Route {
            label: label.to_string(),
            segments,
            kerf_direction,
            entries: Vec::new(),
            path: None,
            offset: None,
            spans: Vec::new(),
            breaks: Vec::new(),
            pauses: Vec::new(),
            error,
            warnings: Vec::new(),
        }
    }

    /// Return the segments to the caller.
    pub fn ungroup(self) -> Vec<Segment> {
        self.segments
    }

    /// Rebuild all derived data from the segments and `config`.
    pub fn recompute(&mut self, config: &MachineConfig) {
        self.entries.clear();
        self.path = None;
        self.offset = None;
        self.spans.clear();
        self.breaks.clear();
        self.pauses.clear();
        self.error.clear();
        self.warnings.clear();

        let entries = match RouteAssembler::default().assemble(&self.label, &self.segments) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Route {}: {}", self.label, e);
                self.error = e.to_string();
                return;
            }
        };

        let items = layout(&self.segments, &entries);
        let flat = flatten(&items, &source_runs(&items));

        self.entries = entries;
        self.spans = flat.spans;
        self.breaks = flat.breaks;
        self.pauses = flat.pauses;
        self.path = RailPair::new(flat.left, flat.right).ok();

        let engine = KerfOffsetEngine::from_config(config);
        match engine.offset_route(&items, &config.rails(), self.kerf_direction) {
            Ok(output) => {
                self.offset = output.rails;
                self.warnings.extend(output.warnings);
            }
            Err(e) => {
                warn!("Route {}: {}", self.label, e);
                self.error = e.to_string();
                return;
            }
        }

        if config.wire.stretch_verification {
            if let Some(rails) = &self.offset {
                let validator = WireStretchValidator::from_config(config);
                if let Some(message) = validator.validate(&self.label, rails) {
                    self.warnings.push(message);
                }
            }
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Segment indices in traversal order
    pub fn data(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.index).collect()
    }

    /// Reversal flags parallel to [`Route::data`]
    pub fn data_direction(&self) -> Vec<bool> {
        self.entries.iter().map(|e| e.reversed).collect()
    }

    /// Flattened rails before kerf compensation
    pub fn path(&self) -> Option<&RailPair> {
        self.path.as_ref()
    }

    /// Flattened rails after kerf compensation
    pub fn offset(&self) -> Option<&RailPair> {
        self.offset.as_ref()
    }

    pub fn spans(&self) -> &[SegmentSpan] {
        &self.spans
    }

    pub fn breaks(&self) -> &[usize] {
        &self.breaks
    }

    pub fn pauses(&self) -> &[PauseMark] {
        &self.pauses
    }

    pub fn kerf_direction(&self) -> KerfDirection {
        self.kerf_direction
    }

    /// Empty when the route is valid
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Traversal-ordered source samples of every run.
pub(crate) fn source_runs<'r>(items: &'r [RouteItem<'_>]) -> Vec<Vec<&'r RailPair>> {
    items
        .iter()
        .filter_map(|item| match item {
            RouteItem::Run(pieces) => Some(pieces.iter().map(|p| &p.rails).collect()),
            RouteItem::Rotation { .. } => None,
        })
        .collect()
}
