//! Per-sensor configuration and live record.

use crate::state::{ButtonState, Summary};

/// Direction in which a touch moves the filtered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Increasing,
    Decreasing,
}

/// Which measurement polarities one scan visit takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SampleType {
    Normal = 0b01,
    Inverted = 0b10,
    #[default]
    Differential = 0b11,
}

impl SampleType {
    pub const fn includes_normal(self) -> bool {
        (self as u8) & (Self::Normal as u8) != 0
    }

    pub const fn includes_inverted(self) -> bool {
        (self as u8) & (Self::Inverted as u8) != 0
    }
}

/// Delta thresholds, in the filtered unit. These are the persisted values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub released_to_approached: f32,
    pub approached_to_released: f32,
    pub approached_to_pressed: f32,
    pub pressed_to_approached: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            released_to_approached: 50.0,
            approached_to_released: 40.0,
            approached_to_pressed: 150.0,
            pressed_to_approached: 120.0,
        }
    }
}

impl Thresholds {
    /// Hysteresis holds when each release threshold sits at or below its
    /// matching entry threshold.
    pub fn is_ordered(&self) -> bool {
        self.approached_to_released <= self.released_to_approached
            && self.pressed_to_approached <= self.approached_to_pressed
    }

    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }

    /// Storage order of the record.
    pub const fn as_array(&self) -> [f32; 4] {
        [
            self.released_to_approached,
            self.approached_to_released,
            self.approached_to_pressed,
            self.pressed_to_approached,
        ]
    }

    pub const fn from_array(v: [f32; 4]) -> Self {
        Self {
            released_to_approached: v[0],
            approached_to_released: v[1],
            approached_to_pressed: v[2],
            pressed_to_approached: v[3],
        }
    }
}

/// Minimum time (ms) a tentative state must persist before it is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTimes {
    pub released_to_approached_ms: u32,
    pub approached_to_released_ms: u32,
    pub approached_to_pressed_ms: u32,
    pub pressed_to_approached_ms: u32,
}

impl Default for HoldTimes {
    fn default() -> Self {
        Self {
            released_to_approached_ms: 10,
            approached_to_released_ms: 10,
            approached_to_pressed_ms: 10,
            pressed_to_approached_ms: 10,
        }
    }
}

/// Bitmasks over sensor indices forced back to pre-calibration on a given
/// transition of the owning sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForceCalibration {
    pub releasing_from_approached: u32,
    pub approaching_from_released: u32,
    pub approaching_from_pressed: u32,
    pub pressing: u32,
}

impl ForceCalibration {
    pub const fn union(&self) -> u32 {
        self.releasing_from_approached
            | self.approaching_from_released
            | self.approaching_from_pressed
            | self.pressing
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    /// Electrode reference, for diagnostics.
    pub electrode: u32,
    pub polarity: Polarity,
    pub sample_type: SampleType,
    pub thresholds: Thresholds,
    pub hold_times: HoldTimes,
    pub pre_calibration_ms: u32,
    pub calibration_ms: u32,
    /// 0 disables the timeout.
    pub approached_timeout_ms: u32,
    /// 0 disables the timeout.
    pub pressed_timeout_ms: u32,
    pub filter_coeff: u16,
    pub force_calibration: ForceCalibration,
    pub slew_limiter: bool,
    /// Fixed offset that calibration must not overwrite.
    pub manual_offset: Option<f32>,
    pub noise_measurement: bool,
    pub state_machine: bool,
    pub freeze_when_any_approached: bool,
    pub freeze_when_any_pressed: bool,
    /// Delta at full touch for `map_delta`; 0 uses the running maximum.
    pub full_scale_delta: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            electrode: 0,
            polarity: Polarity::default(),
            sample_type: SampleType::default(),
            thresholds: Thresholds::default(),
            hold_times: HoldTimes::default(),
            pre_calibration_ms: 100,
            calibration_ms: 500,
            approached_timeout_ms: 300_000,
            pressed_timeout_ms: 300_000,
            filter_coeff: 16,
            force_calibration: ForceCalibration::default(),
            slew_limiter: false,
            manual_offset: None,
            noise_measurement: false,
            state_machine: true,
            freeze_when_any_approached: false,
            freeze_when_any_pressed: false,
            full_scale_delta: 0.0,
        }
    }
}

impl SensorConfig {
    pub fn with_electrode(electrode: u32) -> Self {
        Self {
            electrode,
            ..Self::default()
        }
    }

    /// Upper bound for the averaging counters.
    pub(crate) fn counter_cap(&self) -> u32 {
        u32::from(self.filter_coeff.saturating_sub(1))
    }
}

/// Running statistics updated every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorStats {
    pub raw: i32,
    pub value: f32,
    pub avg: f32,
    pub delta: f32,
    pub max_delta: f32,
    pub noise_power: f32,
    pub offset_value: f32,
    pub counter: u32,
    pub noise_counter: u32,
    pub last_sampled_at: u32,
    pub state_changed_at: u32,
}

/// One electrode's slot in the array.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub(crate) config: SensorConfig,
    pub(crate) stats: SensorStats,
    pub(crate) state: ButtonState,
    pub(crate) summary: Summary,
    pub(crate) label: &'static str,
    /// Set while `set_state` runs for this sensor.
    pub(crate) changing: bool,
    pub(crate) forced_cal: bool,
    pub(crate) slew_first_sample: bool,
}

impl Sensor {
    pub(crate) fn new(config: SensorConfig, now_ms: u32) -> Self {
        let state = ButtonState::PreCalibrating;
        Self {
            stats: SensorStats {
                offset_value: config.manual_offset.unwrap_or(0.0),
                state_changed_at: now_ms,
                ..SensorStats::default()
            },
            config,
            state,
            summary: Summary::from(state),
            label: state.label(),
            changing: false,
            forced_cal: false,
            slew_first_sample: true,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn stats(&self) -> &SensorStats {
        &self.stats
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn raw(&self) -> i32 {
        self.stats.raw
    }

    pub fn value(&self) -> f32 {
        self.stats.value
    }

    pub fn avg(&self) -> f32 {
        self.stats.avg
    }

    pub fn delta(&self) -> f32 {
        self.stats.delta
    }

    pub fn offset(&self) -> f32 {
        self.stats.offset_value
    }

    /// True while the sensor recalibrates on request of another transition.
    pub fn is_force_calibrating(&self) -> bool {
        self.forced_cal
    }

    pub(crate) fn is_approached_now(&self) -> bool {
        self.stats.delta >= self.config.thresholds.released_to_approached
    }

    pub(crate) fn is_pressed_now(&self) -> bool {
        self.stats.delta >= self.config.thresholds.approached_to_pressed
    }

    pub(crate) fn is_released_now(&self) -> bool {
        self.stats.delta <= self.config.thresholds.approached_to_released
    }

    /// Milliseconds spent in the current state as of the last sample.
    pub(crate) fn time_in_state(&self) -> u32 {
        self.stats
            .last_sampled_at
            .wrapping_sub(self.stats.state_changed_at)
    }

    pub(crate) fn refresh_summary(&mut self) {
        self.summary = Summary::from(self.state);
        self.label = self.state.label();
    }
}
