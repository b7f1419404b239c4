use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use touch_config::{TouchEvent, load_touch_script_csv};

fn write_script(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("script.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_script("at_ms,sensor,level\n1000, 0, 400\n1200,0,0\n1200,1,-20\n");
    let events = load_touch_script_csv(&path).unwrap();
    assert_eq!(
        events,
        vec![
            TouchEvent {
                at_ms: 1000,
                sensor: 0,
                level: 400
            },
            TouchEvent {
                at_ms: 1200,
                sensor: 0,
                level: 0
            },
            TouchEvent {
                at_ms: 1200,
                sensor: 1,
                level: -20
            },
        ]
    );
}

#[rstest]
#[case::wrong_headers("time,sensor,level\n1,0,1\n", "must have headers")]
#[case::backwards("at_ms,sensor,level\n20,0,1\n10,0,0\n", "goes back in time")]
#[case::bad_number("at_ms,sensor,level\nsoon,0,1\n", "invalid CSV row 2")]
fn rejects_bad_scripts(#[case] body: &str, #[case] needle: &str) {
    let (_dir, path) = write_script(body);
    let err = load_touch_script_csv(&path).unwrap_err();
    assert!(err.to_string().contains(needle), "{err}");
}

#[rstest]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(load_touch_script_csv(&dir.path().join("nope.csv")).is_err());
}
