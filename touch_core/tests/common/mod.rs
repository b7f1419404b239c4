//! Shared fixtures for the touch_core integration tests.
#![allow(dead_code)]

use touch_core::mocks::{Level, LevelSample};
use touch_core::{ButtonState, SensorConfig, TouchArray};
use touch_traits::ManualClock;

/// Cycle period used by every test.
pub const PERIOD_MS: u32 = 10;
pub const PER_SENSOR: usize = 4;
/// Idle level; each sensor reads `2 * PER_SENSOR * level` per cycle.
pub const BASELINE: i32 = 100;

pub struct Rig {
    pub array: TouchArray,
    pub clock: ManualClock,
    pub levels: Vec<Level>,
}

impl Rig {
    pub fn new(configs: Vec<SensorConfig>) -> Self {
        Self::starting_at(0, configs)
    }

    pub fn starting_at(start_ms: u32, configs: Vec<SensorConfig>) -> Self {
        let clock = ManualClock::starting_at(start_ms);
        let levels: Vec<Level> = configs.iter().map(|_| Level::new(BASELINE)).collect();
        let builder = configs
            .into_iter()
            .zip(&levels)
            .fold(TouchArray::builder(), |b, (cfg, level)| {
                b.add_sensor_with(LevelSample::new(level), cfg)
            });
        let array = builder
            .with_clock(Box::new(clock.clone()))
            .measurements_per_sensor(PER_SENSOR)
            .build()
            .expect("build");
        Self {
            array,
            clock,
            levels,
        }
    }

    pub fn with_sensors(n: usize) -> Self {
        Self::new(
            (0..n)
                .map(|i| SensorConfig::with_electrode(u32::try_from(i).unwrap()))
                .collect(),
        )
    }

    /// Advance time by one period and run a cycle.
    pub fn tick(&mut self) {
        self.clock.advance(PERIOD_MS);
        let _ = self.array.run_cycle();
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Tick until every sensor has finished calibrating.
    pub fn settle(&mut self) {
        for _ in 0..500 {
            self.tick();
            if (0..self.array.sensor_count())
                .all(|ch| self.array.state(ch) == Some(ButtonState::Released))
            {
                return;
            }
        }
        panic!("array did not settle: {:?}", self.states());
    }

    /// Set the level of `ch` so its delta becomes `delta` counts.
    pub fn push(&self, ch: usize, delta: i32) {
        let per = i32::try_from(2 * PER_SENSOR).unwrap();
        self.levels[ch].set(BASELINE + delta / per);
    }

    pub fn release(&self, ch: usize) {
        self.levels[ch].set(BASELINE);
    }

    pub fn states(&self) -> Vec<ButtonState> {
        (0..self.array.sensor_count())
            .map(|ch| self.array.state(ch).unwrap())
            .collect()
    }
}
