//! # FoamCut
//!
//! Toolpath planner and GCODE generator for 4/5-axis hot-wire foam cutting
//! machines. Two carriages move the ends of a heated wire across a foam
//! block; every move is a pair of coordinates, one per rail.
//!
//! ## Architecture
//!
//! FoamCut is organized as a workspace with multiple crates:
//!
//! 1. **foamcut-core** - Points, rail planes, source edges, errors
//! 2. **foamcut-settings** - Machine configuration record and persistence
//! 3. **foamcut-designer** - Projection, segments, routes, kerf compensation
//! 4. **foamcut-camtools** - GCODE compiler and mirror pass
//! 5. **foamcut** - Command line binary that integrates all crates

use anyhow::Context;
use std::path::Path;

pub use foamcut_camtools::{mirror_gcode, CamToolError, GCodeCompiler, GCodeMirror};
pub use foamcut_core::{Edge, Error, Point3, RailPair, Result};
pub use foamcut_designer::{Job, JobOutput, Route, Segment};
pub use foamcut_settings::{default_config_path, MachineConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Console output on stderr, filtered by `RUST_LOG` with INFO (or DEBUG
/// when `verbose`) as the floor.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .with_line_number(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("logging already initialized")?;

    Ok(())
}

/// Pick the machine record for a job.
///
/// An explicit file wins, then the record embedded in the job, then the
/// per-user config when it exists, then the defaults.
pub fn resolve_config(explicit: Option<&Path>, job: &Job) -> anyhow::Result<MachineConfig> {
    if let Some(path) = explicit {
        return MachineConfig::load_from_file(path)
            .with_context(|| format!("loading machine config {}", path.display()));
    }
    if let Some(config) = &job.config {
        return Ok(config.clone());
    }
    match default_config_path().filter(|p| p.exists()) {
        Some(path) => MachineConfig::load_from_file(&path)
            .with_context(|| format!("loading machine config {}", path.display())),
        None => Ok(MachineConfig::default()),
    }
}

/// A compiled job ready to be written out
#[derive(Debug, Clone)]
pub struct CompiledJob {
    pub gcode: String,
    /// Mirrored twin, when requested
    pub mirrored: Option<String>,
    /// Unused failed segments, then segment and route advisories
    pub warnings: Vec<String>,
}

/// Build every route of `job` and compile them in order.
///
/// Fails without producing anything when a route cannot be assembled.
pub fn compile_job(job: &Job, config: &MachineConfig, mirror: bool) -> anyhow::Result<CompiledJob> {
    let output = job
        .build_with(config)
        .with_context(|| format!("building job {}", job.name))?;

    let rejected: Vec<String> = output
        .invalid_routes()
        .map(|route| route.error().to_string())
        .collect();
    if !rejected.is_empty() {
        anyhow::bail!("job {} has invalid routes: {}", job.name, rejected.join("; "));
    }

    let mut warnings = output.errors.clone();
    warnings.extend(output.warnings.iter().cloned());
    for route in &output.routes {
        warnings.extend(route.warnings().iter().cloned());
    }

    let compiler = GCodeCompiler::new(config.clone())?;
    let gcode = compiler.compile(&output.routes)?;
    let mirrored = if mirror {
        Some(mirror_gcode(&gcode, &config.axes)?)
    } else {
        None
    };

    Ok(CompiledJob {
        gcode,
        mirrored,
        warnings,
    })
}
