use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let image = dir.join("eeprom.bin");
    let toml = format!(
        r#"
[array]
measurements_per_sensor = 4

[store]
image = '{}'
capacity = 256

[[sensors]]
[[sensors]]
{extra}
"#,
        image.display()
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_script(dir: &Path) -> PathBuf {
    let path = dir.join("script.csv");
    fs::write(&path, "at_ms,sensor,level\n1000,0,40\n1500,0,0\n").unwrap();
    path
}

fn touch_cmd(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("touch_cli").unwrap();
    cmd.arg("--log-level").arg("error").arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["schedule"], 0, " ", "stdout")]
#[case(&["simulate", "--cycles", "0"], 0, "after 0 cycles", "stdout")]
#[case(&["simulate", "--cycles"], 2, "value is required", "stderr")]
#[case(&["frobnicate"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let mut cmd = touch_cmd(&cfg);
    for a in args {
        cmd.arg(a);
    }
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn scripted_press_is_reported_in_text() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let script = write_script(dir.path());

    touch_cmd(&cfg)
        .args(["simulate", "--cycles", "200", "--noise", "0", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "610 ms  sensor 1: NoisePowerMeasurement -> Released",
        ))
        .stdout(predicate::str::contains(
            "1030 ms  sensor 0: ApproachedToPressed -> Pressed",
        ))
        .stdout(predicate::str::contains(
            "1530 ms  sensor 0: ApproachedToReleased -> Released",
        ))
        .stdout(predicate::str::contains("after 200 cycles: 0=Released 1=Released"));
}

#[rstest]
fn script_naming_unknown_sensor_fails() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let script = dir.path().join("bad.csv");
    fs::write(&script, "at_ms,sensor,level\n10,5,40\n").unwrap();

    touch_cmd(&cfg)
        .args(["simulate", "--script"])
        .arg(&script)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("names sensor 5"));
}

#[rstest]
fn bad_script_header_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let script = dir.path().join("bad.csv");
    fs::write(&script, "time,sensor,level\n10,0,40\n").unwrap();

    touch_cmd(&cfg)
        .args(["simulate", "--script"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected 'at_ms,sensor,level'"));
}

#[rstest]
fn invalid_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "filter_coeff = 0");

    touch_cmd(&cfg)
        .arg("schedule")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("filter_coeff"));
}

#[rstest]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    touch_cmd(&dir.path().join("nope.toml"))
        .arg("schedule")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read config"));
}

#[rstest]
fn save_then_inspect_round_trip() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let image = dir.path().join("eeprom.bin");

    touch_cmd(&cfg)
        .args(["simulate", "--cycles", "5", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings saved"));

    let bytes = fs::read(&image).unwrap();
    assert_eq!(bytes.len(), 256);
    assert_eq!(bytes[0], 0xC7);
    assert_eq!(bytes[37], 0xFF);

    touch_cmd(&cfg)
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("sensors 2 (37 bytes)"))
        .stdout(predicate::str::contains("crc ok"))
        .stdout(predicate::str::contains("sensor 1: r2a 50 a2r 40 a2p 150 p2a 120"));
}

#[rstest]
fn corrupt_image_is_reported_but_simulation_continues() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let image = dir.path().join("eeprom.bin");

    touch_cmd(&cfg)
        .args(["simulate", "--cycles", "1", "--save"])
        .assert()
        .success();
    let mut bytes = fs::read(&image).unwrap();
    bytes[5] ^= 0x40;
    fs::write(&image, &bytes).unwrap();

    touch_cmd(&cfg)
        .arg("inspect")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("CRC MISMATCH"))
        .stderr(predicate::str::contains("checksum"));

    touch_cmd(&cfg)
        .args(["simulate", "--cycles", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings error latched (code -5)"));
}

#[rstest]
fn erased_image_inspects_as_empty() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    fs::write(dir.path().join("eeprom.bin"), [0xFFu8; 256]).unwrap();

    touch_cmd(&cfg)
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("erased"));
}

#[rstest]
fn save_without_store_is_a_store_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[[sensors]]\n").unwrap();

    touch_cmd(&path)
        .args(["simulate", "--cycles", "1", "--save"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No settings store"));
}
