use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &Path) -> PathBuf {
    let toml = r#"
[array]
measurements_per_sensor = 4

[[sensors]]
[[sensors]]
[[sensors]]
"#;
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON line"))
        .collect()
}

/// Every state-change line carries time, sensor and both state labels.
#[rstest]
fn simulate_change_lines_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    let script = dir.path().join("script.csv");
    fs::write(&script, "at_ms,sensor,level\n1000,2,40\n").unwrap();

    let mut cmd = Command::cargo_bin("touch_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["simulate", "--cycles", "150", "--noise", "0", "--script"])
        .arg(&script);

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    let (summary, changes) = lines.split_last().expect("summary line");

    for v in changes {
        assert!(v.get("t_ms").and_then(serde_json::Value::as_u64).is_some());
        assert!(v.get("sensor").and_then(serde_json::Value::as_u64).is_some());
        assert!(v.get("old").and_then(serde_json::Value::as_str).is_some());
        assert!(v.get("new").and_then(serde_json::Value::as_str).is_some());
    }
    let pressed = changes
        .iter()
        .find(|v| v["new"] == "Pressed")
        .expect("press reported");
    assert_eq!(pressed["sensor"], 2);
    assert_eq!(pressed["t_ms"], 1030);

    assert_eq!(summary["cycles"], 150);
    assert_eq!(summary["states"][2], "Pressed");
    assert_eq!(summary["states"][0], "Released");
    assert_eq!(summary["status"], 0);
    assert_eq!(summary["saved"], false);
}

#[rstest]
fn schedule_json_lists_every_visit() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());

    let mut cmd = Command::cargo_bin("touch_cli").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("schedule");
    let out = cmd.assert().success().get_output().stdout.clone();
    let v = &json_lines(&out)[0];

    assert_eq!(v["sensors"], 3);
    assert_eq!(v["measurements_per_sensor"], 4);
    let order = v["order"].as_array().unwrap();
    assert_eq!(order.len(), 12);
    for s in 0..3u64 {
        assert_eq!(order.iter().filter(|x| x.as_u64() == Some(s)).count(), 4);
    }
}

/// Errors in JSON mode are a single object on stdout.
#[rstest]
fn json_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());

    let mut cmd = Command::cargo_bin("touch_cli").unwrap();
    cmd.arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["inspect", "--image"])
        .arg(dir.path().join("short.bin"));
    fs::write(dir.path().join("short.bin"), [0u8; 3]).unwrap();

    let out = cmd.assert().code(3).get_output().stdout.clone();
    let v = &json_lines(&out)[0];
    assert_eq!(v["reason"], "Error");
    assert!(v["message"].as_str().unwrap().contains("bytes, expected 1024"));
}
