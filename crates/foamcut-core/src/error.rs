//! Error handling for FoamCut
//!
//! Provides the error taxonomy shared by every layer of the toolpath pipeline:
//! - Geometry errors (degenerate inputs, failed offsets)
//! - Connectivity errors (segments that do not share an endpoint)
//! - Configuration errors (invalid machine records, missing job context)
//!
//! Advisory conditions (wire stretch, near-parallel offset fallback) are not
//! errors; they travel as warnings on the route.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised for degenerate or invalid geometric input. Fatal for the
/// affected segment or kerf run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// An edge or polyline had no usable points
    #[error("Empty geometry: {context}")]
    Empty {
        /// What was being built when the empty input was found.
        context: String,
    },

    /// A rung line runs parallel to a rail plane and never reaches it
    #[error("Line through {from} and {to} is parallel to rail plane x={rail_x:.3}")]
    ParallelToRail {
        /// First point of the line.
        from: String,
        /// Second point of the line.
        to: String,
        /// Offset of the rail along the wire axis.
        rail_x: f64,
    },

    /// Left and Right rails disagree on point count
    #[error("Rail length mismatch: left has {left} points, right has {right}")]
    RailMismatch {
        /// Number of points on the left rail.
        left: usize,
        /// Number of points on the right rail.
        right: usize,
    },

    /// A coordinate was NaN or infinite
    #[error("Non-finite coordinate in {context}")]
    NonFinite {
        /// Where the value was found.
        context: String,
    },

    /// An arc could not be constructed from its three points
    #[error("Degenerate arc: {reason}")]
    DegenerateArc {
        /// Why the arc is degenerate.
        reason: String,
    },

    /// A planar offset could not be computed
    #[error("Offset failed for {segment}: {reason}")]
    OffsetFailed {
        /// Label of the segment being offset.
        segment: String,
        /// The reason the offset failed.
        reason: String,
    },
}

/// Connectivity error type
///
/// Raised by route assembly when consecutive segments cannot be chained.
/// Blocks GCODE generation for the affected route.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectivityError {
    /// Two consecutive segments share no endpoint within tolerance
    #[error("ERROR: {from} not connected with {to}")]
    NotConnected {
        /// Label of the preceding segment.
        from: String,
        /// Label of the following segment.
        to: String,
    },

    /// A route was grouped from an empty segment list
    #[error("ERROR: route {route} has no segments")]
    EmptyRoute {
        /// Label of the route.
        route: String,
    },
}

/// Configuration error type
///
/// Raised when a machine record or job description is unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required configuration key is missing
    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    /// A configuration value is out of its valid range
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange {
        /// Dotted key of the offending value.
        key: String,
        /// The rejected value.
        value: String,
    },

    /// The configuration file format is not supported
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A referenced job object does not exist
    #[error("Missing job context: {0}")]
    MissingJobContext(String),
}

/// Main error type for FoamCut
///
/// Aggregates the per-concern error types so callers can use one `Result`.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Connectivity error
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a plain message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }

    /// Check if this is a connectivity error
    pub fn is_connectivity_error(&self) -> bool {
        matches!(self, Error::Connectivity(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type for FoamCut operations
pub type Result<T> = std::result::Result<T, Error>;
