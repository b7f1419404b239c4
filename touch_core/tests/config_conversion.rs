use touch_core::mocks::{Level, LevelSample};
use touch_core::{Polarity, SampleType, SensorConfig, TouchArray};
use touch_traits::{ManualClock, SampleMethod};

const CONFIG: &str = r#"
[array]
measurements_per_sensor = 6
slew_limiter = true

[defaults]
released_to_approached = 30.0
approached_to_released = 20.0
filter_coeff = 8

[[sensors]]
electrode = 4
polarity = "decreasing"

[[sensors]]
released_to_approached = 45.0
sample_type = "normal"
force_calibration_when_pressing = 1
manual_offset = 12.5
"#;

fn methods(n: usize) -> Vec<Box<dyn SampleMethod>> {
    let level = Level::new(5);
    (0..n)
        .map(|_| Box::new(LevelSample::new(&level)) as Box<dyn SampleMethod>)
        .collect()
}

#[test]
fn config_file_drives_the_builder() {
    let cfg = touch_config::load_toml(CONFIG).unwrap();
    let array = TouchArray::builder()
        .with_clock(Box::new(ManualClock::new()))
        .from_config(&cfg, methods(2))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(array.measurements_per_sensor(), 6);
    let a = array.sensor(0).unwrap().config();
    let b = array.sensor(1).unwrap().config();

    assert_eq!(a.electrode, 4);
    assert_eq!(a.polarity, Polarity::Decreasing);
    assert_eq!(a.thresholds.released_to_approached, 30.0);
    assert_eq!(a.thresholds.approached_to_pressed, 150.0);
    assert_eq!(a.filter_coeff, 8);
    assert!(a.slew_limiter);

    assert_eq!(b.electrode, 1);
    assert_eq!(b.sample_type, SampleType::Normal);
    assert_eq!(b.thresholds.released_to_approached, 45.0);
    assert_eq!(b.thresholds.approached_to_released, 20.0);
    assert_eq!(b.force_calibration.pressing, 1);
    assert_eq!(b.manual_offset, Some(12.5));
    assert_eq!(array.sensor(1).unwrap().offset(), 12.5);
}

#[test]
fn empty_sensor_entry_maps_to_library_defaults() {
    let cfg = touch_config::SensorCfg::default();
    assert_eq!(SensorConfig::from(&cfg), SensorConfig::default());
}

#[test]
fn method_count_must_match_sensor_count() {
    let cfg = touch_config::load_toml(CONFIG).unwrap();
    let err = TouchArray::builder().from_config(&cfg, methods(3)).unwrap_err();
    assert!(err.to_string().contains("3 sample methods"));
}

#[test]
fn invalid_config_is_refused_before_building() {
    let cfg = touch_config::load_toml("[[sensors]]\nfilter_coeff = 0\n").unwrap();
    let err = TouchArray::builder().from_config(&cfg, methods(1)).unwrap_err();
    assert!(format!("{err:#}").contains("filter_coeff"));
}

#[test]
fn converted_builder_is_ready_to_build() {
    let cfg = touch_config::load_toml(CONFIG).unwrap();
    let b = TouchArray::builder().from_config(&cfg, methods(2)).unwrap();
    assert!(format!("{b:?}").contains("measurements_per_sensor: Some(6)"));
}
