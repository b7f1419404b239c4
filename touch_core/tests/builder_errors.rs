use rstest::rstest;
use touch_core::error::BuildError;
use touch_core::mocks::{Level, LevelSample};
use touch_core::{SensorConfig, TouchArray, TouchError};

fn sample() -> LevelSample {
    LevelSample::new(&Level::new(10))
}

fn build_error(r: touch_core::error::Result<TouchArray>) -> BuildError {
    let err = r.expect_err("build should fail");
    match err.downcast_ref::<BuildError>() {
        Some(e) => e.clone(),
        None => panic!("expected BuildError, got: {err:?}"),
    }
}

#[rstest]
fn no_sensors_is_rejected() {
    let e = build_error(TouchArray::builder().measurements_per_sensor(4).build());
    assert_eq!(e, BuildError::NoSensors);
}

#[rstest]
fn thirty_three_sensors_is_too_many() {
    let b = (0..33).fold(TouchArray::builder(), |b, _| b.add_sensor(sample()));
    let e = build_error(b.measurements_per_sensor(1).build());
    assert_eq!(e, BuildError::TooManySensors(33));
}

#[rstest]
fn try_build_reports_missing_measurement_count() {
    let e = build_error(TouchArray::builder().add_sensor(sample()).try_build());
    assert!(matches!(e, BuildError::InvalidConfig(msg) if msg.contains("measurements")));
}

#[rstest]
#[case::zero_measurements(0, SensorConfig::default())]
#[case::zero_filter(4, SensorConfig { filter_coeff: 0, ..SensorConfig::default() })]
fn invalid_config_is_rejected(#[case] per_sensor: usize, #[case] cfg: SensorConfig) {
    let b = TouchArray::builder().add_sensor_with(sample(), cfg);
    let e = build_error(b.measurements_per_sensor(per_sensor).build());
    assert!(matches!(e, BuildError::InvalidConfig(_)), "got {e:?}");
}

#[rstest]
fn non_finite_threshold_is_rejected() {
    let mut cfg = SensorConfig::default();
    cfg.thresholds.approached_to_pressed = f32::NAN;
    let b = TouchArray::builder().add_sensor_with(sample(), cfg);
    let e = build_error(b.measurements_per_sensor(2).build());
    assert_eq!(e, BuildError::InvalidConfig("thresholds must be finite"));
}

#[rstest]
fn unordered_thresholds_still_build() {
    let mut cfg = SensorConfig::default();
    cfg.thresholds.approached_to_released = 90.0;
    let array = TouchArray::builder()
        .add_sensor_with(sample(), cfg)
        .measurements_per_sensor(2)
        .build();
    assert!(array.is_ok());
}

#[rstest]
fn custom_order_naming_missing_sensor_is_a_schedule_error() {
    let b = TouchArray::builder()
        .add_sensor(sample())
        .with_scan_order(vec![0, 3]);
    let e = build_error(b.measurements_per_sensor(1).build());
    assert!(matches!(e, BuildError::Schedule(TouchError::ScanOrder(_))));
}

#[rstest]
fn loading_on_build_needs_a_store() {
    let b = TouchArray::builder()
        .add_sensor(sample())
        .load_settings_on_build(true);
    let e = build_error(b.measurements_per_sensor(1).build());
    assert_eq!(
        e,
        BuildError::InvalidConfig("loading settings on build requires a store")
    );
}

#[rstest]
fn builder_debug_lists_its_inputs() {
    let b = TouchArray::builder()
        .add_sensor(sample())
        .add_sensor(sample())
        .measurements_per_sensor(3);
    let dbg = format!("{b:?}");
    assert!(dbg.contains("sensors: 2"), "{dbg}");
    assert!(dbg.contains("measurements_per_sensor: Some(3)"), "{dbg}");
}
