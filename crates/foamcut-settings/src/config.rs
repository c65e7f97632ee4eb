//! Machine configuration for FoamCut
//!
//! Provides the machine record consumed by every stage of the pipeline,
//! with file handling and validation. Supports JSON and TOML file formats.
//!
//! Configuration is organized into logical sections:
//! - Machine geometry (rail separation, travel, origin)
//! - Axis letters for both carriages and the rotary table
//! - Homing and parking positions
//! - Feed rates and wire heating
//! - Kerf compensation
//! - GCODE command templates
//! - Travel defaults and the foam block description

use foamcut_core::{ConfigError, Error, Point3, Rails, Result, TimeUnits};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Side of travel that a kerf offset is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KerfDirection {
    /// Offset to the left of travel
    #[default]
    Normal,
    /// No offset
    None,
    /// Offset to the right of travel
    Reversed,
}

impl KerfDirection {
    /// Signed multiplier for the offset magnitude.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::None => 0.0,
            Self::Reversed => -1.0,
        }
    }
}

impl fmt::Display for KerfDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::None => write!(f, "None"),
            Self::Reversed => write!(f, "Reversed"),
        }
    }
}

impl FromStr for KerfDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" | "positive" => Ok(Self::Normal),
            "none" => Ok(Self::None),
            "reversed" | "negative" => Ok(Self::Reversed),
            _ => Err(format!("Unknown kerf direction: {}", s)),
        }
    }
}

/// How the kerf offset magnitude is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KerfStrategy {
    /// Compensation disabled
    None,
    /// Constant offset everywhere
    #[default]
    Static,
    /// Offset scaled by local wire speed
    Dynamic,
}

impl fmt::Display for KerfStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Static => write!(f, "Static"),
            Self::Dynamic => write!(f, "Dynamic"),
        }
    }
}

/// Physical layout of the machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineGeometry {
    /// Distance between the two rails (nominal wire length)
    pub field_width: f64,
    /// Horizontal carriage travel
    pub horizontal_travel: f64,
    /// Vertical carriage travel
    pub vertical_travel: f64,
    /// Machine zero along the horizontal carriage axis
    pub origin_x: f64,
    /// Position of the rotary table along the horizontal axis
    pub origin_rotation_x: f64,
    /// Machine carries a rotary table
    pub five_axis: bool,
}

impl Default for MachineGeometry {
    fn default() -> Self {
        Self {
            field_width: 730.0,
            horizontal_travel: 550.0,
            vertical_travel: 300.0,
            origin_x: 0.0,
            origin_rotation_x: 275.0,
            five_axis: true,
        }
    }
}

/// Axis letters used in generated GCODE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisMapping {
    /// Left carriage, horizontal
    pub x1: String,
    /// Left carriage, vertical
    pub z1: String,
    /// Right carriage, horizontal
    pub x2: String,
    /// Right carriage, vertical
    pub z2: String,
    /// Rotary table
    pub r1: String,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            x1: "X".to_string(),
            z1: "Y".to_string(),
            x2: "Z".to_string(),
            z2: "A".to_string(),
            r1: "B".to_string(),
        }
    }
}

/// Homing cycle and the position it establishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingSettings {
    pub enabled: bool,
    pub command: String,
    pub init_position_command: String,
    pub x1: f64,
    pub z1: f64,
    pub x2: f64,
    pub z2: f64,
    pub r1: f64,
}

impl Default for HomingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "$H".to_string(),
            init_position_command: "G92 {Position}".to_string(),
            x1: 10.0,
            z1: 290.0,
            x2: 10.0,
            z2: 290.0,
            r1: 0.0,
        }
    }
}

/// Parking position used before and after the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkingSettings {
    pub enabled: bool,
    pub x: f64,
    pub z: f64,
    pub r1: f64,
}

impl Default for ParkingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            x: 10.0,
            z: 290.0,
            r1: 0.0,
        }
    }
}

/// Feed rates in units per second
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedRates {
    pub cut: f64,
    #[serde(rename = "move")]
    pub travel: f64,
    pub rotate: f64,
}

impl Default for FeedRates {
    fn default() -> Self {
        Self {
            cut: 7.0,
            travel: 30.0,
            rotate: 30.0,
        }
    }
}

/// Wire heating and stretch limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireSettings {
    pub min_power: f64,
    pub max_power: f64,
    /// Scale power with the instantaneous wire length
    pub dynamic_power: bool,
    pub stretch_verification: bool,
    /// Allowed wire length above the rail separation
    pub stretch_tolerance: f64,
}

impl Default for WireSettings {
    fn default() -> Self {
        Self {
            min_power: 700.0,
            max_power: 1000.0,
            dynamic_power: false,
            stretch_verification: true,
            stretch_tolerance: 2.0,
        }
    }
}

impl WireSettings {
    /// Power for a given wire length, clamped to `max_power`.
    pub fn compensated_power(&self, wire_length: f64, field_width: f64) -> f64 {
        let power = self.min_power * wire_length / field_width;
        power.min(self.max_power)
    }
}

/// Kerf compensation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KerfSettings {
    /// Offset distance
    pub length: f64,
    pub strategy: KerfStrategy,
    /// Route default, segments may override it
    pub direction: KerfDirection,
    /// Divisor applied to the rail with the shorter source edge
    pub degree: f64,
}

impl Default for KerfSettings {
    fn default() -> Self {
        Self {
            length: 0.6,
            strategy: KerfStrategy::Static,
            direction: KerfDirection::Normal,
            degree: 1.0,
        }
    }
}

/// GCODE command templates
///
/// Tokens: `{Position}`, `{FeedRate}`, `{WirePower}`, `{Duration}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    pub cut: String,
    #[serde(rename = "move")]
    pub travel: String,
    pub pause: String,
    pub wire_on: String,
    pub wire_off: String,
    pub time_units: TimeUnits,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            cut: "G01 {Position} F{FeedRate} {WirePower}".to_string(),
            travel: "G00 {Position} F{FeedRate}".to_string(),
            pause: "G04 P{Duration}".to_string(),
            wire_on: "M03 S{WirePower}".to_string(),
            wire_off: "M05".to_string(),
            time_units: TimeUnits::Seconds,
        }
    }
}

/// Defaults for synthetic segments and sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelSettings {
    /// Height of Enter/Exit lead lines
    pub safe_height: f64,
    /// Default dwell in seconds
    pub pause_duration: f64,
    /// Arc-length spacing of curve samples
    pub discretization_step: f64,
}

impl Default for TravelSettings {
    fn default() -> Self {
        Self {
            safe_height: 200.0,
            pause_duration: 1.0,
            discretization_step: 0.5,
        }
    }
}

/// Raw foam block, reported in the program header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoamBlock {
    pub width: f64,
    pub length: f64,
    pub height: f64,
    /// Left-bottom-front corner
    pub position: Point3,
}

impl Default for FoamBlock {
    fn default() -> Self {
        Self {
            width: 400.0,
            length: 300.0,
            height: 50.0,
            position: Point3::default(),
        }
    }
}

/// Complete machine configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MachineConfig {
    pub geometry: MachineGeometry,
    pub axes: AxisMapping,
    pub homing: HomingSettings,
    pub parking: ParkingSettings,
    pub feed_rates: FeedRates,
    pub wire: WireSettings,
    pub kerf: KerfSettings,
    pub commands: CommandTemplates,
    pub travel: TravelSettings,
    pub foam_block: FoamBlock,
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn out_of_range(key: &str, value: impl ToString) -> Error {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl MachineConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Rail planes derived from the field width
    pub fn rails(&self) -> Rails {
        Rails::from_field_width(self.geometry.field_width)
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("Failed to read config file: {}", e)))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid JSON config: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid TOML config: {}", e)))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into());
        };

        config.validate()?;
        debug!("Loaded machine config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into());
        };

        std::fs::write(path, content)
            .map_err(|e| Error::other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !is_positive(self.geometry.field_width) {
            return Err(out_of_range(
                "geometry.field_width",
                self.geometry.field_width,
            ));
        }

        if !is_positive(self.travel.discretization_step) {
            return Err(out_of_range(
                "travel.discretization_step",
                self.travel.discretization_step,
            ));
        }

        if self.travel.pause_duration < 0.0 {
            return Err(out_of_range(
                "travel.pause_duration",
                self.travel.pause_duration,
            ));
        }

        let feeds = [
            ("feed_rates.cut", self.feed_rates.cut),
            ("feed_rates.move", self.feed_rates.travel),
            ("feed_rates.rotate", self.feed_rates.rotate),
        ];
        for (key, value) in feeds {
            if !is_positive(value) {
                return Err(out_of_range(key, value));
            }
        }

        if self.wire.min_power < 0.0 || self.wire.min_power > self.wire.max_power {
            return Err(out_of_range(
                "wire.min_power",
                format!("{} (max {})", self.wire.min_power, self.wire.max_power),
            ));
        }

        if self.wire.stretch_tolerance < 0.0 {
            return Err(out_of_range(
                "wire.stretch_tolerance",
                self.wire.stretch_tolerance,
            ));
        }

        if self.kerf.length < 0.0 {
            return Err(out_of_range("kerf.length", self.kerf.length));
        }

        if !is_positive(self.kerf.degree) {
            return Err(out_of_range("kerf.degree", self.kerf.degree));
        }

        let axes = [
            ("axes.x1", &self.axes.x1),
            ("axes.z1", &self.axes.z1),
            ("axes.x2", &self.axes.x2),
            ("axes.z2", &self.axes.z2),
            ("axes.r1", &self.axes.r1),
        ];
        for (key, letter) in axes {
            if letter.trim().is_empty() {
                return Err(ConfigError::MissingKey(key.to_string()).into());
            }
        }

        let templates = [
            ("commands.cut", &self.commands.cut, "{Position}"),
            ("commands.move", &self.commands.travel, "{Position}"),
            ("commands.pause", &self.commands.pause, "{Duration}"),
        ];
        for (key, template, token) in templates {
            if !template.contains(token) {
                return Err(out_of_range(key, format!("'{}' lacks {}", template, token)));
            }
        }

        if self.homing.enabled && !self.homing.init_position_command.contains("{Position}") {
            return Err(out_of_range(
                "homing.init_position_command",
                &self.homing.init_position_command,
            ));
        }

        Ok(())
    }
}

/// Per-user location of the machine config
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("foamcut").join("machine.toml"))
}
