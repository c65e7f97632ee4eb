//! # FoamCut Designer
//!
//! This crate turns source geometry into cut-ready rail paths for a
//! hot-wire machine. It projects edges onto the two rails, models the
//! segments an operator picks, assembles them into continuous routes, and
//! compensates the wire kerf.
//!
//! ## Core Components
//!
//! - **Projector**: matched Left/Right samples from one or two edges
//! - **Segments**: Path, Projection, Move, Join, Enter, Exit and Rotation
//! - **Routes**: connectivity, direction resolution and flattening
//! - **Kerf**: per-rail planar offset with joint repair and resampling
//! - **Wire stretch**: advisory check of rung lengths
//! - **Jobs**: serde descriptions of segments and routes
//!
//! ## Architecture
//!
//! ```text
//! Edges ── Projector ── Segments ── RouteAssembler ── Kerf ── Route
//!                                                      └── WireStretch
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use foamcut_designer::Job;
//!
//! let job = Job::load_from_file(Path::new("wing.toml"))?;
//! let output = job.build()?;
//! for route in &output.routes {
//!     println!("{}: {}", route.label, route.is_valid());
//! }
//! ```

pub mod job;
pub mod kerf;
pub mod projector;
pub mod route;
pub mod segment;
pub mod wire_stretch;

pub use job::{AnchorSpec, Job, JobOutput, RouteSpec, SegmentSource, SegmentSpec};
pub use kerf::{KerfOffsetEngine, KerfOutput, RailSide};
pub use projector::{DualRailProjector, Pairing, Projection};
pub use route::{PauseMark, Route, RouteAssembler, RouteEntry, SegmentSpan};
pub use segment::{Anchor, Movement, MovementKind, Rotation, Segment, SegmentEnd, SegmentKind};
pub use wire_stretch::WireStretchValidator;
