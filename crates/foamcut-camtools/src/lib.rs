//! # FoamCut CAM Tools
//!
//! This crate turns assembled routes into machine programs and
//! post-processes finished programs.
//!
//! ## Tools Included
//!
//! - **GCODE Compiler**: start block, one move per rung, pauses, rotations
//!   and end block, with optional dynamic wire power
//! - **Mirror Pass**: swaps the carriages and negates rotations after the
//!   task block marker, producing the program for the mirrored part

pub mod error;
pub mod gcode;
pub mod mirror;

// Re-export commonly used items
pub use error::{CamToolError, CamToolResult};
pub use gcode::{GCodeCompiler, TASK_BLOCK_MARKER};
pub use mirror::{mirror_gcode, GCodeMirror};
