//! Bridging `touch_config` types to `touch_core` types.

use eyre::WrapErr;
use touch_traits::SampleMethod;

use crate::builder::{Missing, Set, TouchArrayBuilder};
use crate::error::Result;
use crate::sensor::{
    ForceCalibration, HoldTimes, Polarity, SampleType, SensorConfig, Thresholds,
};

impl From<touch_config::Polarity> for Polarity {
    fn from(p: touch_config::Polarity) -> Self {
        match p {
            touch_config::Polarity::Increasing => Self::Increasing,
            touch_config::Polarity::Decreasing => Self::Decreasing,
        }
    }
}

impl From<touch_config::SampleType> for SampleType {
    fn from(t: touch_config::SampleType) -> Self {
        match t {
            touch_config::SampleType::Normal => Self::Normal,
            touch_config::SampleType::Inverted => Self::Inverted,
            touch_config::SampleType::Differential => Self::Differential,
        }
    }
}

/// Unset fields keep the library defaults.
impl From<&touch_config::SensorCfg> for SensorConfig {
    fn from(c: &touch_config::SensorCfg) -> Self {
        let d = Self::default();
        let t = d.thresholds;
        let h = d.hold_times;
        let f = d.force_calibration;
        Self {
            electrode: c.electrode.unwrap_or(d.electrode),
            polarity: c.polarity.map_or(d.polarity, Into::into),
            sample_type: c.sample_type.map_or(d.sample_type, Into::into),
            thresholds: Thresholds {
                released_to_approached: c
                    .released_to_approached
                    .unwrap_or(t.released_to_approached),
                approached_to_released: c
                    .approached_to_released
                    .unwrap_or(t.approached_to_released),
                approached_to_pressed: c.approached_to_pressed.unwrap_or(t.approached_to_pressed),
                pressed_to_approached: c.pressed_to_approached.unwrap_or(t.pressed_to_approached),
            },
            hold_times: HoldTimes {
                released_to_approached_ms: c
                    .released_to_approached_ms
                    .unwrap_or(h.released_to_approached_ms),
                approached_to_released_ms: c
                    .approached_to_released_ms
                    .unwrap_or(h.approached_to_released_ms),
                approached_to_pressed_ms: c
                    .approached_to_pressed_ms
                    .unwrap_or(h.approached_to_pressed_ms),
                pressed_to_approached_ms: c
                    .pressed_to_approached_ms
                    .unwrap_or(h.pressed_to_approached_ms),
            },
            pre_calibration_ms: c.pre_calibration_ms.unwrap_or(d.pre_calibration_ms),
            calibration_ms: c.calibration_ms.unwrap_or(d.calibration_ms),
            approached_timeout_ms: c.approached_timeout_ms.unwrap_or(d.approached_timeout_ms),
            pressed_timeout_ms: c.pressed_timeout_ms.unwrap_or(d.pressed_timeout_ms),
            filter_coeff: c.filter_coeff.unwrap_or(d.filter_coeff),
            force_calibration: ForceCalibration {
                releasing_from_approached: c
                    .force_calibration_when_releasing_from_approached
                    .unwrap_or(f.releasing_from_approached),
                approaching_from_released: c
                    .force_calibration_when_approaching_from_released
                    .unwrap_or(f.approaching_from_released),
                approaching_from_pressed: c
                    .force_calibration_when_approaching_from_pressed
                    .unwrap_or(f.approaching_from_pressed),
                pressing: c.force_calibration_when_pressing.unwrap_or(f.pressing),
            },
            slew_limiter: c.slew_limiter.unwrap_or(d.slew_limiter),
            manual_offset: c.manual_offset.or(d.manual_offset),
            noise_measurement: c.noise_measurement.unwrap_or(d.noise_measurement),
            state_machine: c.state_machine.unwrap_or(d.state_machine),
            freeze_when_any_approached: c
                .freeze_when_any_approached
                .unwrap_or(d.freeze_when_any_approached),
            freeze_when_any_pressed: c
                .freeze_when_any_pressed
                .unwrap_or(d.freeze_when_any_pressed),
            full_scale_delta: c.full_scale_delta.unwrap_or(d.full_scale_delta),
        }
    }
}

/// Per-sensor configurations resolved from a validated config file.
pub fn sensor_configs(cfg: &touch_config::Config) -> Vec<SensorConfig> {
    cfg.effective_sensors()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut c = SensorConfig::from(s);
            if s.electrode.is_none() {
                c.electrode = u32::try_from(i).unwrap_or(u32::MAX);
            }
            if let Some(slew) = cfg.array.slew_limiter {
                c.slew_limiter = slew;
            }
            c
        })
        .collect()
}

impl TouchArrayBuilder<Missing> {
    /// Add one sensor per config entry and set the measurement count.
    ///
    /// `methods` pairs with `[[sensors]]` in order. Clock, store and observer
    /// set before or after this call are kept.
    pub fn from_config(
        self,
        cfg: &touch_config::Config,
        methods: Vec<Box<dyn SampleMethod>>,
    ) -> Result<TouchArrayBuilder<Set>> {
        cfg.validate().wrap_err("invalid touch configuration")?;
        let configs = sensor_configs(cfg);
        if methods.len() != configs.len() {
            eyre::bail!(
                "{} sample methods supplied for {} configured sensors",
                methods.len(),
                configs.len()
            );
        }
        let builder = methods
            .into_iter()
            .zip(configs)
            .fold(self, |b, (m, c)| b.add_boxed_sensor(m, c));
        Ok(builder.measurements_per_sensor(cfg.array.measurements_per_sensor))
    }
}
