use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[bounds]
x_min = 0.0
x_max = 400.0
y_min = 0.0
y_max = 300.0
pol_min = -200.0
pol_max = 180.0

[motion]
xy_speed = 200.0
pol_speed = 200.0
safety_factor = 1.0
fixed_margin_s = 1.0

[wait]
poll_ms = 5
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(key))
        .unwrap_or_else(|| panic!("no JSON line with {key}; stdout was: {stdout}"));
    serde_json::from_str(line).expect("valid JSON")
}

fn assert_pose(v: &serde_json::Value) {
    for axis in ["x", "y", "pol"] {
        assert!(v.get(axis).and_then(|x| x.as_f64()).is_some(), "{axis} in {v}");
    }
}

/// Validate the JSON report of a successful move.
#[rstest]
fn move_report_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("scanner").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["move", "--x", "150", "--y", "140", "--pol=-90", "--timeout-s", "30"]);

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "\"outcome\"");

    assert!(v.get("timestamp").and_then(|x| x.as_i64()).is_some());
    assert_eq!(v["command"], "move");
    assert_pose(&v["target"]);
    assert_pose(&v["final"]);
    assert_eq!(v["final"]["y"].as_f64(), Some(140.0));
    assert_eq!(v["outcome"], "success");
    assert!(v.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert_eq!(v["torque_warnings"].as_u64(), Some(0));
}

/// A timed-out move still prints a report and exits with the outcome code.
#[rstest]
fn timed_out_report_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("scanner").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["move", "--x", "390", "--y", "290", "--pol", "100", "--timeout-s", "0.02"]);

    let out = cmd.assert().code(4).get_output().stdout.clone();
    let v = json_line(&out, "\"outcome\"");
    assert_eq!(v["outcome"], "timed_out");
    assert_ne!(v["final"]["x"].as_f64(), Some(390.0));
}

/// Errors are JSON on stdout when --json is set.
#[rstest]
fn error_json_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("scanner").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["zero", "--axis", "theta"]);

    let out = cmd.assert().code(5).get_output().stdout.clone();
    let v = json_line(&out, "\"reason\"");
    assert_eq!(v["reason"], "Validation");
    assert!(v["message"].as_str().unwrap().contains("theta"));
}

#[rstest]
fn status_and_health_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("scanner")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("status")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "\"position\"");
    assert_pose(&v["position"]);
    assert_eq!(v["in_motion"], false);
    assert_eq!(v["power_fail"], false);
    assert!(v["pol_torque"].as_f64().is_some());

    let out = Command::cargo_bin("scanner")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("health")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "\"status\"");
    assert_eq!(v["status"], "ok");
    assert_eq!(v["backend"], "sim");
    assert_eq!(v["connected"], true);
}
