//! Command line front end: compile jobs, mirror programs, manage the
//! machine config.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use foamcut::{init_logging, resolve_config, GCodeMirror, Job, MachineConfig};
use tracing::{info, warn};

/// Toolpath planner and GCODE generator for hot-wire foam cutters.
#[derive(Parser)]
#[command(version = VERSION_STRING, about)]
struct Args {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a job file and write its GCODE.
    Compile {
        /// Job description (JSON or TOML).
        job: PathBuf,

        /// Machine config; overrides the one embedded in the job.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output path. Defaults to the job path with a `.gcode` extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the mirrored program next to the output.
        #[arg(long)]
        mirror: bool,
    },

    /// Mirror an existing program for the opposite-handed part.
    Mirror {
        /// Source GCODE.
        #[arg(short, long)]
        source: PathBuf,

        /// Output path.
        #[arg(short, long)]
        output: PathBuf,

        /// Machine config supplying the axis letters.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Manage the machine config file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default machine config.
    Init { path: PathBuf },
    /// Load and validate a machine config.
    Check { path: PathBuf },
}

const VERSION_STRING: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_DATE"),
    ")"
);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    match args.command {
        Command::Compile {
            job,
            config,
            output,
            mirror,
        } => compile(&job, config.as_deref(), output, mirror),
        Command::Mirror {
            source,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => MachineConfig::load_from_file(&path)
                    .with_context(|| format!("loading machine config {}", path.display()))?,
                None => MachineConfig::default(),
            };
            GCodeMirror::new(&config.axes)?
                .mirror_file(&source, &output)
                .with_context(|| format!("mirroring {}", source.display()))?;
            Ok(())
        }
        Command::Config(ConfigCommand::Init { path }) => {
            MachineConfig::default()
                .save_to_file(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Default machine config written to {}", path.display());
            Ok(())
        }
        Command::Config(ConfigCommand::Check { path }) => {
            MachineConfig::load_from_file(&path)
                .with_context(|| format!("checking {}", path.display()))?;
            info!("{} is valid", path.display());
            Ok(())
        }
    }
}

fn compile(
    job_path: &Path,
    config: Option<&Path>,
    output: Option<PathBuf>,
    mirror: bool,
) -> anyhow::Result<()> {
    let job = Job::load_from_file(job_path)
        .with_context(|| format!("loading job {}", job_path.display()))?;
    let config = resolve_config(config, &job)?;

    let compiled = foamcut::compile_job(&job, &config, mirror)?;
    for warning in &compiled.warnings {
        warn!("{}", warning);
    }

    let output = output.unwrap_or_else(|| job_path.with_extension("gcode"));
    std::fs::write(&output, &compiled.gcode)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("GCODE saved to {}", output.display());

    if let Some(mirrored) = &compiled.mirrored {
        let path = mirror_path(&output);
        std::fs::write(&path, mirrored).with_context(|| format!("writing {}", path.display()))?;
        info!("Mirrored GCODE saved to {}", path.display());
    }
    Ok(())
}

/// `wing.gcode` becomes `wing_mirror.gcode`.
fn mirror_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}_mirror.gcode", stem))
}
