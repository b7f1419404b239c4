//! Incremental per-sensor filter: sample accumulation, running average,
//! noise power and delta.

use crate::sensor::{Polarity, Sensor};
use crate::state::ButtonState;

impl Sensor {
    /// Start a new cycle's accumulation.
    pub(crate) fn reset_accumulator(&mut self) {
        self.stats.raw = 0;
        self.slew_first_sample = true;
    }

    /// Fold one scan visit into the raw accumulator.
    ///
    /// With the slew limiter on, the first visit of a cycle sets the value
    /// and every later visit moves it by at most one count.
    pub(crate) fn accumulate(&mut self, sample: i32) {
        if self.config.slew_limiter {
            if self.slew_first_sample {
                self.stats.raw = sample;
                self.slew_first_sample = false;
            } else if sample > self.stats.raw {
                self.stats.raw += 1;
            } else if sample < self.stats.raw {
                self.stats.raw -= 1;
            }
        } else {
            self.stats.raw = self.stats.raw.saturating_add(sample);
        }
    }

    /// Whether averaging is frozen by activity elsewhere in the array.
    fn averaging_frozen(&self, any_approached: bool, any_pressed: bool) -> bool {
        !self.forced_cal
            && self.state >= ButtonState::Released
            && ((self.config.freeze_when_any_approached && any_approached)
                || (self.config.freeze_when_any_pressed && any_pressed))
    }

    /// Cumulative moving average that becomes exponential once the counter
    /// saturates at `filter_coeff - 1`.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn update_average(&mut self, any_approached: bool, any_pressed: bool) {
        if self.averaging_frozen(any_approached, any_pressed) {
            return;
        }
        let cap = self.config.counter_cap();
        let stats = &mut self.stats;

        let n = stats.counter as f32;
        stats.avg = (n * stats.avg + stats.value) / (n + 1.0);

        if self.config.noise_measurement && self.state > ButtonState::Calibrating {
            let power = stats.delta * stats.delta;
            let nc = stats.noise_counter as f32;
            stats.noise_power = (nc * stats.noise_power + power) / (nc + 1.0);
            if stats.noise_counter < cap {
                stats.noise_counter += 1;
            }
        }

        if stats.counter < cap {
            stats.counter += 1;
        }
    }

    /// Signed distance of the value from the baseline, in the touch direction.
    pub(crate) fn compute_delta(&mut self) {
        let stats = &mut self.stats;
        stats.delta = if self.state < ButtonState::NoisePowerMeasurement {
            0.0
        } else {
            match self.config.polarity {
                Polarity::Increasing => stats.value - stats.avg,
                Polarity::Decreasing => stats.avg - stats.value,
            }
        };
        if stats.delta > stats.max_delta {
            stats.max_delta = stats.delta;
        }
    }

    /// Clear averaging state on entry to calibration.
    pub(crate) fn reset_calibration(&mut self) {
        let stats = &mut self.stats;
        stats.counter = 0;
        stats.noise_counter = 0;
        stats.avg = 0.0;
        stats.max_delta = 0.0;
        stats.noise_power = 0.0;
        self.forced_cal = false;
        if self.config.manual_offset.is_none() {
            stats.offset_value = 0.0;
        }
    }
}
