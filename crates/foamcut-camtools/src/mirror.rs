//! Mirror pass
//!
//! Turns a finished program into the one for the mirrored part: after the
//! task block marker every carriage move swaps the left and right
//! coordinate pairs, and every table rotation is negated. Everything up to
//! and including the marker is copied unchanged.

use crate::error::{CamToolError, CamToolResult};
use foamcut_settings::AxisMapping;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::info;

const NUMBER: &str = r"(-?[0-9]+\.[0-9]+)";
const UNSIGNED: &str = r"([0-9]+\.[0-9]+)";

pub struct GCodeMirror {
    axes: AxisMapping,
    marker: Regex,
    rotation: Regex,
    movement: Regex,
}

impl GCodeMirror {
    pub fn new(axes: &AxisMapping) -> CamToolResult<Self> {
        for (name, letter) in [
            ("x1", &axes.x1),
            ("z1", &axes.z1),
            ("x2", &axes.x2),
            ("z2", &axes.z2),
            ("r1", &axes.r1),
        ] {
            if letter.is_empty() {
                return Err(CamToolError::Template {
                    name: format!("axes.{}", name),
                    reason: "empty axis letter".to_string(),
                });
            }
        }

        let rotation = format!(r"^(G0[01]) {}{} F{}", regex::escape(&axes.r1), NUMBER, UNSIGNED);
        let movement = format!(
            r"^(G0[01]) {}{} {}{} {}{} {}{} F{}(?: S{})?",
            regex::escape(&axes.x1),
            NUMBER,
            regex::escape(&axes.z1),
            NUMBER,
            regex::escape(&axes.x2),
            NUMBER,
            regex::escape(&axes.z2),
            NUMBER,
            UNSIGNED,
            UNSIGNED
        );

        Ok(Self {
            axes: axes.clone(),
            marker: Regex::new(r"^;.*(TASK BLOCK)")?,
            rotation: Regex::new(&rotation)?,
            movement: Regex::new(&movement)?,
        })
    }

    /// Mirror a whole program. Output lines always end with CRLF.
    pub fn mirror(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        let mut in_task = false;

        for line in source.lines() {
            let line = if in_task {
                self.mirror_line(line).unwrap_or_else(|| line.to_string())
            } else {
                in_task = self.marker.is_match(line);
                line.to_string()
            };
            out.push_str(&line);
            out.push_str("\r\n");
        }
        out
    }

    /// Mirrored form of one body line, `None` if it is not a move.
    fn mirror_line(&self, line: &str) -> Option<String> {
        let axes = &self.axes;

        if let Some(caps) = self.rotation.captures(line) {
            let angle: f64 = caps[2].parse().ok()?;
            let feed: f64 = caps[3].parse().ok()?;
            let angle = if angle != 0.0 { -angle } else { 0.0 };
            return Some(format!("{} {}{:.2} F{:.1}", &caps[1], axes.r1, angle, feed));
        }

        let caps = self.movement.captures(line)?;
        let mut values = [0.0f64; 5];
        for (value, group) in values.iter_mut().zip(2..=6) {
            *value = caps[group].parse().ok()?;
        }
        let [left_x, left_z, right_x, right_z, feed] = values;

        let mut mirrored = format!(
            "{} {}{:.2} {}{:.2} {}{:.2} {}{:.2} F{:.1}",
            &caps[1], axes.x1, right_x, axes.z1, right_z, axes.x2, left_x, axes.z2, left_z, feed
        );
        if let Some(power) = caps.get(7) {
            let power: f64 = power.as_str().parse().ok()?;
            mirrored.push_str(&format!(" S{:.2}", power));
        }
        Some(mirrored)
    }

    pub fn mirror_file(&self, source: &Path, output: &Path) -> CamToolResult<()> {
        let content = fs::read_to_string(source)?;
        fs::write(output, self.mirror(&content))?;
        info!(
            "Mirrored GCODE {} saved to {}",
            source.display(),
            output.display()
        );
        Ok(())
    }
}

/// Mirror `source` with the given axis letters.
pub fn mirror_gcode(source: &str, axes: &AxisMapping) -> CamToolResult<String> {
    Ok(GCodeMirror::new(axes)?.mirror(source))
}
