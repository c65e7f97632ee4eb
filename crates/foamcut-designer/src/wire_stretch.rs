//! Wire stretch check
//!
//! A rung longer than the field width means the carriages pull the wire
//! beyond its rest length. Small excess is absorbed by the wire tensioner;
//! anything above the tolerance is reported. The check is advisory and
//! never blocks compilation.

use foamcut_core::RailPair;
use foamcut_settings::MachineConfig;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct WireStretchValidator {
    field_width: f64,
    tolerance: f64,
}

impl WireStretchValidator {
    pub fn new(field_width: f64, tolerance: f64) -> Self {
        Self {
            field_width,
            tolerance,
        }
    }

    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.geometry.field_width, config.wire.stretch_tolerance)
    }

    /// Stretch of every rung beyond the field width.
    pub fn stretches(&self, rails: &RailPair) -> Vec<f64> {
        rails
            .rung_lengths()
            .into_iter()
            .map(|length| length - self.field_width)
            .collect()
    }

    /// Indices whose stretch exceeds the tolerance.
    pub fn check(&self, rails: &RailPair) -> Vec<usize> {
        self.stretches(rails)
            .into_iter()
            .enumerate()
            .filter(|(_, stretch)| *stretch > self.tolerance)
            .map(|(i, _)| i)
            .collect()
    }

    /// Warning for `name` when any rung is over-stretched.
    pub fn validate(&self, name: &str, rails: &RailPair) -> Option<String> {
        let worst = self
            .stretches(rails)
            .into_iter()
            .filter(|stretch| *stretch > self.tolerance)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))))?;

        let message = format!(
            "Wire about to break in {}: wire stretch is {:.2}mm that is greater than allowed {:.2}mm",
            name, worst, self.tolerance
        );
        warn!("{}", message);
        Some(message)
    }
}
