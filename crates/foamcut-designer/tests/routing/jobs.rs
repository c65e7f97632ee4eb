use foamcut_designer::Job;
use foamcut_settings::KerfDirection;
use std::fs;
use tempfile::TempDir;

const TOML_JOB: &str = r#"
name = "block"

[[segments]]
label = "Enter"
type = "Enter"
at = { point = { x = 0.0, y = 0.0, z = 50.0 } }

[[segments]]
label = "Top"
type = "Projection"
edge = { type = "line", start = { x = 0.0, y = 0.0, z = 50.0 }, end = { x = 0.0, y = 100.0, z = 50.0 } }

[[segments]]
label = "Exit"
type = "Exit"
at = { segment = "Top", end = "last" }
add_pause = true
pause_duration = 3.0

[[routes]]
label = "Cut"
segments = ["Enter", "Top", "Exit"]
kerf_direction = "Reversed"
"#;

#[test]
fn test_toml_job_builds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("block.toml");
    fs::write(&path, TOML_JOB).unwrap();

    let job = Job::load_from_file(&path).unwrap();
    assert_eq!(job.segments.len(), 3);
    assert_eq!(job.routes[0].kerf_direction, Some(KerfDirection::Reversed));

    let output = job.build().unwrap();
    let route = &output.routes[0];
    assert!(route.is_valid(), "{}", route.error());
    assert_eq!(route.kerf_direction(), KerfDirection::Reversed);
    assert_eq!(route.pauses()[0].duration, 3.0);
    assert_eq!(route.path().unwrap().point_count(), 4);
    assert_eq!(route.offset().unwrap().point_count(), 4);
    assert!(output.warnings.is_empty());
}

#[test]
fn test_json_job_round_trip() {
    let dir = TempDir::new().unwrap();
    let toml_path = dir.path().join("block.toml");
    let json_path = dir.path().join("block.json");
    fs::write(&toml_path, TOML_JOB).unwrap();

    let job = Job::load_from_file(&toml_path).unwrap();
    job.save_to_file(&json_path).unwrap();
    let reloaded = Job::load_from_file(&json_path).unwrap();
    assert_eq!(reloaded, job);
}

#[test]
fn test_unknown_anchor_segment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, TOML_JOB.replace("segment = \"Top\"", "segment = \"Side\"")).unwrap();

    let err = Job::load_from_file(&path).unwrap().build().unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("Side"));
}

#[test]
fn test_unsupported_job_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("block.yaml");
    fs::write(&path, TOML_JOB).unwrap();
    assert!(Job::load_from_file(&path).unwrap_err().is_config_error());
}

const PARTLY_BROKEN_JOB: &str = r#"
name = "partly-broken"

[[segments]]
label = "Good"
type = "Projection"
edge = { type = "line", start = { x = 0.0, y = 0.0, z = 10.0 }, end = { x = 0.0, y = 50.0, z = 10.0 } }

[[segments]]
label = "Bad"
type = "Projection"
edge = { type = "arc", start = { x = 0.0, y = 0.0, z = 0.0 }, mid = { x = 0.0, y = 5.0, z = 0.0 }, end = { x = 0.0, y = 10.0, z = 0.0 } }

[[segments]]
label = "Lift"
type = "Exit"
at = { segment = "Bad", end = "last" }

[[routes]]
label = "Uses good"
segments = ["Good"]

[[routes]]
label = "Uses bad"
segments = ["Good", "Bad"]

[[routes]]
label = "Uses lift"
segments = ["Lift"]
"#;

#[test]
fn test_failed_segment_rejects_only_its_routes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partly-broken.toml");
    fs::write(&path, PARTLY_BROKEN_JOB).unwrap();

    let output = Job::load_from_file(&path).unwrap().build().unwrap();
    assert_eq!(output.segments.len(), 1);
    assert_eq!(output.errors.len(), 2);
    assert!(output.errors[0].contains("Bad"), "{}", output.errors[0]);
    assert!(output.errors[0].contains("collinear"), "{}", output.errors[0]);
    assert!(output.errors[1].contains("Lift"), "{}", output.errors[1]);

    let good = &output.routes[0];
    assert!(good.is_valid(), "{}", good.error());
    assert_eq!(good.path().unwrap().point_count(), 2);

    let bad = &output.routes[1];
    assert!(!bad.is_valid());
    assert!(bad.error().contains("Bad"));
    assert!(bad.offset().is_none());

    assert!(!output.routes[2].is_valid());
    assert_eq!(output.invalid_routes().count(), 2);
}
