use rstest::rstest;
use touch_core::mocks::SplitSample;
use touch_core::{SampleType, SensorConfig, TouchArray};
use touch_traits::ManualClock;

const SPLIT: SplitSample = SplitSample {
    normal: 10,
    inverted: 3,
};

fn one_cycle(cfg: SensorConfig, per_sensor: usize) -> TouchArray {
    let clock = ManualClock::new();
    let mut a = TouchArray::builder()
        .add_sensor_with(SPLIT, cfg)
        .with_clock(Box::new(clock.clone()))
        .measurements_per_sensor(per_sensor)
        .build()
        .unwrap();
    clock.advance(10);
    let _ = a.run_cycle();
    a
}

#[rstest]
#[case::normal(SampleType::Normal, 40)]
#[case::inverted(SampleType::Inverted, 12)]
#[case::differential(SampleType::Differential, 26)]
fn sample_type_selects_polarities(#[case] sample_type: SampleType, #[case] raw: i32) {
    let cfg = SensorConfig {
        sample_type,
        ..SensorConfig::default()
    };
    let a = one_cycle(cfg, 2);
    let s = a.sensor(0).unwrap();
    assert_eq!(s.raw(), raw);
    assert_eq!(s.value(), raw as f32);
    assert_eq!(s.stats().last_sampled_at, 10);
}

#[test]
fn slew_limiter_snaps_then_holds() {
    let cfg = SensorConfig {
        slew_limiter: true,
        ..SensorConfig::default()
    };
    let a = one_cycle(cfg, 4);
    assert_eq!(a.sensor(0).unwrap().raw(), 13);
}

#[test]
fn accumulator_restarts_every_cycle() {
    let clock = ManualClock::new();
    let mut a = TouchArray::builder()
        .add_sensor(SPLIT)
        .with_clock(Box::new(clock.clone()))
        .measurements_per_sensor(3)
        .build()
        .unwrap();
    for _ in 0..3 {
        clock.advance(10);
        let _ = a.run_cycle();
        assert_eq!(a.sensor(0).unwrap().raw(), 39);
    }
}
