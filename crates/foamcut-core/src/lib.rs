//! # FoamCut Core
//!
//! Core types, geometry, and error handling for FoamCut.
//! Provides the value types shared by every stage of the hot-wire toolpath
//! pipeline: points and rail planes, matched rail samples, raw source
//! edges, and the error taxonomy.

pub mod edge;
pub mod error;
pub mod geometry;
pub mod units;

pub use edge::{are_coplanar, sample_count, synchronize_endpoints, Edge, SyncedEndpoints};
pub use error::{ConfigError, ConnectivityError, Error, GeometryError, Result};
pub use geometry::{
    intersect_line_plane, polyline_length, Plane, Point3, RailPair, Rails,
    COMMON_POINT_TOLERANCE, STRAIGHT_LINE_TOLERANCE,
};
pub use units::{format_feed_rate, TimeUnits};
