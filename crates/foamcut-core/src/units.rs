//! Unit conversion utilities
//!
//! Feed rates are configured in units per second and printed in units per
//! minute. Dwell durations are configured in seconds and printed in the
//! controller's time unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time unit expected by the controller's dwell command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeUnits {
    /// Dwell argument in seconds
    #[default]
    Seconds,
    /// Dwell argument in milliseconds
    Milliseconds,
}

impl TimeUnits {
    /// Convert a duration in seconds into this unit.
    pub fn from_seconds(&self, seconds: f64) -> f64 {
        match self {
            Self::Seconds => seconds,
            Self::Milliseconds => seconds * 1000.0,
        }
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds => write!(f, "Seconds"),
            Self::Milliseconds => write!(f, "Milliseconds"),
        }
    }
}

impl FromStr for TimeUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seconds" | "s" | "sec" => Ok(Self::Seconds),
            "milliseconds" | "ms" => Ok(Self::Milliseconds),
            _ => Err(format!("Unknown time unit: {}", s)),
        }
    }
}

/// Format a feed rate given in units/second as units/minute.
///
/// Uses the shortest decimal that round-trips and always keeps a
/// fractional part, so `7.0` prints as `420.0`.
pub fn format_feed_rate(units_per_second: f64) -> String {
    format!("{:?}", units_per_second * 60.0)
}
