//! Error types for the CAM tools crate.
//!
//! This module provides structured error types for GCODE compilation and
//! post-processing of finished programs.

use std::io;
use thiserror::Error;

/// Errors that can occur during GCODE generation.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// A route carries an error and cannot be compiled.
    #[error("Route {route} rejected: {reason}")]
    RouteRejected { route: String, reason: String },

    /// The progress callback asked to stop.
    #[error("GCODE generation cancelled after {done} of {total} segments")]
    Cancelled { done: usize, total: usize },

    /// Nothing to compile.
    #[error("Empty job: {0}")]
    EmptyJob(String),

    /// A command template or axis letter is unusable.
    #[error("Invalid template '{name}': {reason}")]
    Template { name: String, reason: String },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// A pattern built from the axis mapping failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Error raised by the geometry or settings layers.
    #[error(transparent)]
    Core(#[from] foamcut_core::Error),
}

/// Result type for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;
