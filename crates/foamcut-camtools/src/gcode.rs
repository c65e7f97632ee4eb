//! GCODE compiler
//!
//! Serializes routes into a hot-wire program: a start block with the foam
//! block description, homing, parking and wire enable; a task block with
//! one move per rung; and an end block that lifts, disables and parks.
//!
//! Positions are printed with two decimals and feed rates in units per
//! minute. Every line ends with CRLF.

use crate::error::{CamToolError, CamToolResult};
use foamcut_core::{format_feed_rate, Point3};
use foamcut_designer::{MovementKind, Route, Segment};
use foamcut_settings::MachineConfig;
use tracing::{debug, info};

/// Comment line that opens the cuttable body
pub const TASK_BLOCK_MARKER: &str = "; *** TASK BLOCK ***";

const LINE_END: &str = "\r\n";

pub struct GCodeCompiler {
    config: MachineConfig,
}

impl GCodeCompiler {
    /// Create a compiler, rejecting templates without their mandatory tokens.
    pub fn new(config: MachineConfig) -> CamToolResult<Self> {
        let commands = &config.commands;
        check_template("cut", &commands.cut, "{Position}")?;
        check_template("move", &commands.travel, "{Position}")?;
        check_template("pause", &commands.pause, "{Duration}")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Compile routes in order into one program.
    pub fn compile(&self, routes: &[Route]) -> CamToolResult<String> {
        self.compile_with_progress(routes, |_, _| true)
    }

    /// Compile with a progress callback.
    ///
    /// `progress(done, total)` runs after every segment; returning `false`
    /// cancels and discards everything generated so far.
    pub fn compile_with_progress<F>(&self, routes: &[Route], mut progress: F) -> CamToolResult<String>
    where
        F: FnMut(usize, usize) -> bool,
    {
        if routes.is_empty() {
            return Err(CamToolError::EmptyJob("no routes selected".to_string()));
        }
        if let Some(route) = routes.iter().find(|r| !r.is_valid()) {
            return Err(CamToolError::RouteRejected {
                route: route.label.clone(),
                reason: route.error().to_string(),
            });
        }

        let total: usize = routes.iter().map(|r| r.spans().len()).sum();
        let mut done = 0;
        let mut start_point = None;
        let mut task = vec![";".to_string(), TASK_BLOCK_MARKER.to_string()];

        for route in routes {
            let offset = route.offset();
            if start_point.is_none() {
                start_point = offset.map(|rails| rails.first_rung());
            }

            task.push(";".to_string());
            task.push(format!("; --- Route begin [{}] ---", route.label));

            for span in route.spans() {
                let segment = &route.segments()[span.index];
                match segment {
                    Segment::Rotation(rotation) => {
                        task.push(format!("; - Rotation [{}] -", rotation.label));
                        task.push(self.rotation(rotation.angle));
                    }
                    Segment::Movement(movement) => {
                        task.push(format!("; - {} [{}]", segment.kind(), movement.label));
                        if let Some(rails) = offset {
                            for i in span.start..span.end {
                                let (left, right) = (rails.left()[i], rails.right()[i]);
                                let lead_in = movement.kind == MovementKind::Enter
                                    && span.run_start
                                    && i == span.start;
                                task.push(if lead_in {
                                    self.travel(&left, &right)
                                } else {
                                    self.cut(&left, &right)
                                });
                            }
                        }
                        if let Some(duration) = movement.pause.filter(|d| *d > 0.0) {
                            task.push(self.pause(duration));
                        }
                    }
                }

                done += 1;
                if !progress(done, total) {
                    debug!("Compilation cancelled at {}/{}", done, total);
                    return Err(CamToolError::Cancelled { done, total });
                }
            }

            task.push(format!("; --- Route end [{}] ---", route.label));
            task.push(";".to_string());
        }

        let mut lines = self.start_block(start_point);
        lines.extend(task);
        lines.extend(self.end_block());

        info!("GCODE generated: {} routes, {} lines", routes.len(), lines.len());
        let mut program = lines.join(LINE_END);
        program.push_str(LINE_END);
        Ok(program)
    }

    fn start_block(&self, start_point: Option<(Point3, Point3)>) -> Vec<String> {
        let config = &self.config;
        let block = &config.foam_block;
        let mut lines = vec![
            ";*** FOAM BLOCK ***".to_string(),
            format!(";Width: {:?}", block.width),
            format!(";Length: {:?}", block.length),
            format!(";Height: {:?}", block.height),
            ";Position - Left-Bottom-Front corner".to_string(),
            format!(";Position.X: {:?}", block.position.x),
            format!(";Position.Y: {:?}", block.position.y),
            format!(";Position.Z: {:?}", block.position.z),
            "; *** START BLOCK ***".to_string(),
        ];

        let homing = &config.homing;
        if homing.enabled {
            lines.push(homing.command.clone());
            let mut position = self.position(homing.x1, homing.z1, homing.x2, homing.z2);
            if config.geometry.five_axis {
                position.push(' ');
                position.push_str(&self.rotation_position(homing.r1));
            }
            lines.push(homing.init_position_command.replace("{Position}", &position));
        }

        let parking = &config.parking;
        if parking.enabled {
            lines.push(self.park());
            if config.geometry.five_axis {
                lines.push(self.rotation(parking.r1));
            }
            if let Some((left, right)) = start_point {
                let position = self.position(left.y, parking.z, right.y, parking.z);
                lines.push(self.render(&config.commands.travel, &position, config.feed_rates.travel, ""));
            }
        }

        let power = match start_point {
            Some((left, right)) if config.wire.dynamic_power => self.compensated_power(&left, &right),
            _ => config.wire.min_power,
        };
        lines.push(
            config
                .commands
                .wire_on
                .replace("{WirePower}", &format!("{:.2}", power)),
        );
        lines
    }

    fn end_block(&self) -> Vec<String> {
        let config = &self.config;
        let axes = &config.axes;
        let parking = &config.parking;
        let mut lines = vec!["; *** END BLOCK ***".to_string()];

        if parking.enabled {
            let up = format!("{}{:.2} {}{:.2}", axes.z1, parking.z, axes.z2, parking.z);
            lines.push(self.render(&config.commands.travel, &up, config.feed_rates.travel, ""));
        }

        lines.push(config.commands.wire_off.clone());

        if parking.enabled {
            lines.push(self.park());
            if config.geometry.five_axis {
                lines.push(self.rotation(parking.r1));
            }
        }
        lines
    }

    /// Carriage coordinates, horizontal values taken relative to the origin.
    fn position(&self, x1: f64, z1: f64, x2: f64, z2: f64) -> String {
        let axes = &self.config.axes;
        let origin = self.config.geometry.origin_x;
        format!(
            "{}{:.2} {}{:.2} {}{:.2} {}{:.2}",
            axes.x1,
            x1 - origin,
            axes.z1,
            z1,
            axes.x2,
            x2 - origin,
            axes.z2,
            z2
        )
    }

    fn rotation_position(&self, angle: f64) -> String {
        format!("{}{:.2}", self.config.axes.r1, angle)
    }

    fn render(&self, template: &str, position: &str, feed: f64, power: &str) -> String {
        template
            .replace("{Position}", position)
            .replace("{FeedRate}", &format_feed_rate(feed))
            .replace("{WirePower}", power)
            .trim_end()
            .to_string()
    }

    fn park(&self) -> String {
        let parking = &self.config.parking;
        let position = self.position(parking.x, parking.z, parking.x, parking.z);
        self.render(&self.config.commands.travel, &position, self.config.feed_rates.travel, "")
    }

    fn rotation(&self, angle: f64) -> String {
        self.render(
            &self.config.commands.travel,
            &self.rotation_position(angle),
            self.config.feed_rates.rotate,
            "",
        )
    }

    fn travel(&self, left: &Point3, right: &Point3) -> String {
        let position = self.position(left.y, left.z, right.y, right.z);
        self.render(&self.config.commands.travel, &position, self.config.feed_rates.travel, "")
    }

    fn cut(&self, left: &Point3, right: &Point3) -> String {
        let position = self.position(left.y, left.z, right.y, right.z);
        let power = if self.config.wire.dynamic_power {
            format!("S{:.2}", self.compensated_power(left, right))
        } else {
            String::new()
        };
        self.render(&self.config.commands.cut, &position, self.config.feed_rates.cut, &power)
    }

    fn pause(&self, seconds: f64) -> String {
        let duration = self.config.commands.time_units.from_seconds(seconds);
        self.config
            .commands
            .pause
            .replace("{Duration}", &format!("{:.2}", duration))
    }

    fn compensated_power(&self, left: &Point3, right: &Point3) -> f64 {
        self.config
            .wire
            .compensated_power(left.distance_to(right), self.config.geometry.field_width)
    }
}

fn check_template(name: &str, template: &str, token: &str) -> CamToolResult<()> {
    if template.contains(token) {
        Ok(())
    } else {
        Err(CamToolError::Template {
            name: name.to_string(),
            reason: format!("missing {}", token),
        })
    }
}
