use foamcut_camtools::{CamToolError, GCodeCompiler};
use foamcut_core::{Edge, Point3};
use foamcut_designer::{Anchor, DualRailProjector, Route, Segment};
use foamcut_settings::{KerfDirection, KerfStrategy, MachineConfig};

fn config() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.kerf.strategy = KerfStrategy::None;
    config
}

fn line(config: &MachineConfig, label: &str, from: (f64, f64), to: (f64, f64)) -> Segment {
    let edge = Edge::line(Point3::new(0.0, from.0, from.1), Point3::new(0.0, to.0, to.1));
    Segment::projection(label, &edge, &DualRailProjector::from_config(config)).unwrap()
}

fn route(config: &MachineConfig, label: &str, segments: Vec<Segment>) -> Route {
    Route::group(label, segments, KerfDirection::Normal, config)
}

#[test]
fn test_single_segment_program() {
    let config = config();
    let routes = vec![route(&config, "Top", vec![line(&config, "Top", (0.0, 0.0), (10.0, 0.0))])];
    let gcode = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap();

    let lines: Vec<&str> = gcode.lines().collect();
    assert_eq!(
        lines,
        vec![
            ";*** FOAM BLOCK ***",
            ";Width: 400.0",
            ";Length: 300.0",
            ";Height: 50.0",
            ";Position - Left-Bottom-Front corner",
            ";Position.X: 0.0",
            ";Position.Y: 0.0",
            ";Position.Z: 0.0",
            "; *** START BLOCK ***",
            "M03 S700.00",
            ";",
            "; *** TASK BLOCK ***",
            ";",
            "; --- Route begin [Top] ---",
            "; - Projection [Top]",
            "G01 X0.00 Y0.00 Z0.00 A0.00 F420.0",
            "G01 X10.00 Y0.00 Z10.00 A0.00 F420.0",
            "; --- Route end [Top] ---",
            ";",
            "; *** END BLOCK ***",
            "M05",
        ]
    );
    assert!(gcode.ends_with("\r\n"));
    assert_eq!(gcode.matches('\n').count(), gcode.matches("\r\n").count());
}

#[test]
fn test_shared_points_emitted_once() {
    let config = config();
    let segments = vec![
        line(&config, "A", (0.0, 0.0), (10.0, 0.0)),
        line(&config, "B", (10.0, 0.0), (10.0, 10.0)),
    ];
    let routes = vec![route(&config, "Corner", segments)];
    let gcode = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap();

    assert_eq!(gcode.matches("F420.0").count(), 3);
    assert!(gcode.contains("; - Projection [B]\r\nG01 X10.00 Y10.00 Z10.00 A10.00 F420.0\r\n"));
}

#[test]
fn test_homing_and_parking() {
    let mut config = config();
    config.homing.enabled = true;
    config.parking.enabled = true;
    let routes = vec![route(&config, "Top", vec![line(&config, "Top", (5.0, 0.0), (10.0, 0.0))])];
    let gcode = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap();

    assert!(gcode.contains("$H\r\nG92 X10.00 Y290.00 Z10.00 A290.00 B0.00\r\n"));
    assert!(gcode.contains("G00 X10.00 Y290.00 Z10.00 A290.00 F1800.0\r\nG00 B0.00 F1800.0\r\n"));
    assert!(gcode.contains("G00 X5.00 Y290.00 Z5.00 A290.00 F1800.0\r\nM03 S700.00"));
    assert!(gcode.contains("; *** END BLOCK ***\r\nG00 Y290.00 A290.00 F1800.0\r\nM05\r\n"));
}

#[test]
fn test_dynamic_wire_power() {
    let mut config = config();
    config.wire.dynamic_power = true;
    let routes = vec![route(&config, "Top", vec![line(&config, "Top", (0.0, 0.0), (10.0, 0.0))])];
    let gcode = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap();
    assert!(gcode.contains("G01 X0.00 Y0.00 Z0.00 A0.00 F420.0 S700.00"));
}

#[test]
fn test_pause_and_rotation() {
    let config = config();
    let segments = vec![
        line(&config, "A", (0.0, 0.0), (10.0, 0.0)).with_pause(Some(2.0)),
        Segment::rotation("Turn", 90.0, "Body"),
        line(&config, "B", (10.0, 0.0), (20.0, 0.0)),
    ];
    let routes = vec![route(&config, "Rotated", segments)];
    let gcode = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap();

    assert!(gcode.contains("G01 X10.00 Y0.00 Z10.00 A0.00 F420.0\r\nG04 P2.00\r\n"));
    assert!(gcode.contains("; - Rotation [Turn] -\r\nG00 B90.00 F1800.0\r\n"));
    // Across a rotation the first point is emitted again.
    assert_eq!(gcode.matches("G01 X10.00 Y0.00 Z10.00 A0.00 F420.0").count(), 2);
}

#[test]
fn test_enter_starts_with_travel() {
    let config = config();
    let projector = DualRailProjector::from_config(&config);
    let anchor = Anchor::single(Point3::new(0.0, 0.0, 50.0));
    let segments = vec![
        Segment::enter("Enter", &anchor, config.travel.safe_height, &projector).unwrap(),
        line(&config, "Top", (0.0, 50.0), (10.0, 50.0)),
    ];
    let routes = vec![route(&config, "Lead", segments)];
    let gcode = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap();

    assert!(gcode.contains(
        "; - Enter [Enter]\r\nG00 X0.00 Y200.00 Z0.00 A200.00 F1800.0\r\nG01 X0.00 Y50.00 Z0.00 A50.00 F420.0\r\n"
    ));
}

#[test]
fn test_invalid_route_rejected() {
    let config = config();
    let segments = vec![
        line(&config, "A", (0.0, 0.0), (10.0, 0.0)),
        line(&config, "B", (50.0, 0.0), (60.0, 0.0)),
    ];
    let routes = vec![route(&config, "Broken", segments)];
    let err = GCodeCompiler::new(config).unwrap().compile(&routes).unwrap_err();
    match err {
        CamToolError::RouteRejected { route, reason } => {
            assert_eq!(route, "Broken");
            assert_eq!(reason, "ERROR: A not connected with B");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cancellation_discards_output() {
    let config = config();
    let segments = vec![
        line(&config, "A", (0.0, 0.0), (10.0, 0.0)),
        line(&config, "B", (10.0, 0.0), (20.0, 0.0)),
    ];
    let routes = vec![route(&config, "Long", segments)];
    let compiler = GCodeCompiler::new(config).unwrap();

    let mut seen = Vec::new();
    let result = compiler.compile_with_progress(&routes, |done, total| {
        seen.push((done, total));
        done < 1
    });
    assert!(matches!(result, Err(CamToolError::Cancelled { done: 1, total: 2 })));
    assert_eq!(seen, vec![(1, 2)]);
}

#[test]
fn test_empty_job() {
    let compiler = GCodeCompiler::new(config()).unwrap();
    assert!(matches!(compiler.compile(&[]), Err(CamToolError::EmptyJob(_))));
}
