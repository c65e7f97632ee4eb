//! Job description
//!
//! A job is a flat arena of segment descriptions plus routes that refer to
//! segments by label. Building a job is a pure function of the description
//! and the machine record: every call rebuilds all segments and then all
//! routes from scratch.

use crate::projector::{DualRailProjector, Pairing};
use crate::route::Route;
use crate::segment::{Anchor, Segment, SegmentEnd};
use crate::wire_stretch::WireStretchValidator;
use foamcut_core::{ConfigError, Edge, Error, Point3, Result};
use foamcut_settings::{KerfDirection, MachineConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where a synthetic segment starts or ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnchorSpec {
    /// One end of a segment defined earlier in the job
    SegmentEnd { segment: String, end: SegmentEnd },
    /// Explicit point, optionally with its opposite-rail partner
    Point {
        point: Point3,
        #[serde(default)]
        opposite: Option<Point3>,
    },
}

impl AnchorSpec {
    fn resolve(&self, built: &HashMap<String, Segment>) -> Result<Anchor> {
        match self {
            AnchorSpec::Point { point, opposite } => Ok(Anchor {
                point: *point,
                opposite: *opposite,
            }),
            AnchorSpec::SegmentEnd { segment, end } => {
                let source = built.get(segment).ok_or_else(|| {
                    ConfigError::MissingJobContext(format!("unknown anchor segment {}", segment))
                })?;
                Anchor::at_segment_end(source, *end).ok_or_else(|| {
                    ConfigError::MissingJobContext(format!("segment {} has no rails to anchor to", segment))
                        .into()
                })
            }
        }
    }
}

/// Source geometry of one segment, tagged by segment type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SegmentSource {
    Path {
        first: Edge,
        second: Edge,
        #[serde(default)]
        pairing: Pairing,
    },
    Projection {
        edge: Edge,
    },
    Move {
        from: AnchorSpec,
        #[serde(default)]
        dy: f64,
        #[serde(default)]
        dz: f64,
    },
    Join {
        from: AnchorSpec,
        to: AnchorSpec,
    },
    Enter {
        at: AnchorSpec,
    },
    Exit {
        at: AnchorSpec,
    },
    Rotation {
        angle: f64,
        #[serde(default)]
        reference: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub label: String,
    #[serde(flatten)]
    pub source: SegmentSource,
    #[serde(default)]
    pub add_pause: bool,
    /// Seconds; the machine default applies when unset
    #[serde(default)]
    pub pause_duration: Option<f64>,
    #[serde(default)]
    pub kerf_direction: Option<KerfDirection>,
}

impl AnchorSpec {
    fn segment(&self) -> Option<&str> {
        match self {
            AnchorSpec::SegmentEnd { segment, .. } => Some(segment),
            AnchorSpec::Point { .. } => None,
        }
    }
}

impl SegmentSpec {
    /// Labels of the earlier segments this one is anchored to.
    pub fn anchor_segments(&self) -> Vec<&str> {
        let anchors: Vec<&AnchorSpec> = match &self.source {
            SegmentSource::Move { from, .. } => vec![from],
            SegmentSource::Join { from, to } => vec![from, to],
            SegmentSource::Enter { at } | SegmentSource::Exit { at } => vec![at],
            SegmentSource::Path { .. } | SegmentSource::Projection { .. } | SegmentSource::Rotation { .. } => {
                Vec::new()
            }
        };
        anchors.into_iter().filter_map(AnchorSpec::segment).collect()
    }

    /// Build a segment whose anchors are all explicit points.
    pub fn build(&self, config: &MachineConfig) -> Result<Segment> {
        self.build_with(config, &HashMap::new())
    }

    /// Build a segment, resolving anchors against `built`.
    pub fn build_with(&self, config: &MachineConfig, built: &HashMap<String, Segment>) -> Result<Segment> {
        let projector = DualRailProjector::from_config(config);
        let safe_height = config.travel.safe_height;
        let label = self.label.as_str();

        let segment = match &self.source {
            SegmentSource::Path {
                first,
                second,
                pairing,
            } => Segment::path(label, first, second, *pairing, &projector)?,
            SegmentSource::Projection { edge } => Segment::projection(label, edge, &projector)?,
            SegmentSource::Move { from, dy, dz } => {
                Segment::move_by(label, &from.resolve(built)?, *dy, *dz, &projector)?
            }
            SegmentSource::Join { from, to } => {
                Segment::join(label, &from.resolve(built)?, &to.resolve(built)?, &projector)?
            }
            SegmentSource::Enter { at } => {
                Segment::enter(label, &at.resolve(built)?, safe_height, &projector)?
            }
            SegmentSource::Exit { at } => {
                Segment::exit(label, &at.resolve(built)?, safe_height, &projector)?
            }
            SegmentSource::Rotation { angle, reference } => Segment::rotation(label, *angle, reference),
        };

        let pause = self
            .add_pause
            .then(|| self.pause_duration.unwrap_or(config.travel.pause_duration));
        Ok(segment
            .with_pause(pause)
            .with_kerf_direction(self.kerf_direction))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub label: String,
    /// Segment labels in operator order
    pub segments: Vec<String>,
    /// Falls back to the machine's kerf direction
    #[serde(default)]
    pub kerf_direction: Option<KerfDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    #[serde(default)]
    pub config: Option<MachineConfig>,
    #[serde(default)]
    pub segments: Vec<SegmentSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

/// Everything a job build produces
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// All segments, in job order
    pub segments: Vec<Segment>,
    pub routes: Vec<Route>,
    /// Segment-level advisories; route advisories stay on their route
    pub warnings: Vec<String>,
    /// Segments that could not be built, each message naming its segment.
    /// Routes using one of them are rejected; the rest still build.
    pub errors: Vec<String>,
}

impl JobOutput {
    pub fn invalid_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| !r.is_valid())
    }
}

impl Job {
    /// Load a job from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("Failed to read job file: {}", e)))?;

        let job: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| Error::other(format!("Invalid JSON job: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| Error::other(format!("Invalid TOML job: {}", e)))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into());
        };

        if let Some(config) = &job.config {
            config.validate()?;
        }
        debug!("Loaded job {} from {}", job.name, path.display());
        Ok(job)
    }

    /// Save the job to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize job: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self).map_err(|e| Error::other(format!("Failed to serialize job: {}", e)))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into());
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build with the job's embedded machine record, or the defaults.
    pub fn build(&self) -> Result<JobOutput> {
        let config = self.config.clone().unwrap_or_default();
        self.build_with(&config)
    }

    /// Build every segment, then every route.
    ///
    /// A segment with bad geometry is recorded in [`JobOutput::errors`] and
    /// rejects only the routes that use it, directly or through an anchor.
    /// Configuration problems (duplicate or unknown labels) fail the job.
    pub fn build_with(&self, config: &MachineConfig) -> Result<JobOutput> {
        let mut built: HashMap<String, Segment> = HashMap::with_capacity(self.segments.len());
        let mut failed: HashMap<String, String> = HashMap::new();
        let mut segments = Vec::with_capacity(self.segments.len());
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for spec in &self.segments {
            if built.contains_key(&spec.label) || failed.contains_key(&spec.label) {
                return Err(ConfigError::ValueOutOfRange {
                    key: "segments.label".to_string(),
                    value: format!("{} is used twice", spec.label),
                }
                .into());
            }

            let outcome = match spec.anchor_segments().into_iter().find(|s| failed.contains_key(*s)) {
                Some(source) => Err(format!(
                    "ERROR: segment {} is anchored to failed segment {}",
                    spec.label, source
                )),
                None => match spec.build_with(config, &built) {
                    Ok(segment) => Ok(segment),
                    Err(e) if e.is_geometry_error() => {
                        Err(format!("ERROR: segment {} failed: {}", spec.label, e))
                    }
                    Err(e) => return Err(e),
                },
            };

            match outcome {
                Ok(segment) => {
                    debug!("Built {} [{}]", segment.kind(), segment.label());
                    built.insert(spec.label.clone(), segment.clone());
                    segments.push(segment);
                }
                Err(message) => {
                    warn!("{}", message);
                    failed.insert(spec.label.clone(), message.clone());
                    errors.push(message);
                }
            }
        }

        if config.wire.stretch_verification {
            let validator = WireStretchValidator::from_config(config);
            for segment in &segments {
                if let Some(rails) = segment.rails() {
                    warnings.extend(validator.validate(segment.label(), rails));
                }
            }
        }

        let mut routes = Vec::with_capacity(self.routes.len());
        for spec in &self.routes {
            let mut members = Vec::with_capacity(spec.segments.len());
            let mut rejection = None;
            for label in &spec.segments {
                if let Some(segment) = built.get(label) {
                    members.push(segment.clone());
                } else if let Some(message) = failed.get(label) {
                    rejection.get_or_insert_with(|| message.clone());
                } else {
                    return Err(ConfigError::MissingJobContext(format!(
                        "route {} refers to unknown segment {}",
                        spec.label, label
                    ))
                    .into());
                }
            }

            let direction = spec.kerf_direction.unwrap_or(config.kerf.direction);
            routes.push(match rejection {
                Some(reason) => Route::rejected(&spec.label, members, direction, reason),
                None => Route::group(&spec.label, members, direction, config),
            });
        }

        info!(
            "Job {}: {} segments, {} routes",
            self.name,
            segments.len(),
            routes.len()
        );
        Ok(JobOutput {
            segments,
            routes,
            warnings,
            errors,
        })
    }
}
