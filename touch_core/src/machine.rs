//! Debounce/calibration state machine and forced group recalibration.
//!
//! Sensors live in a [`SensorBank`] and are addressed by index. Transitions go
//! through one guarded path, which holds a per-sensor guard while it
//! runs; a request for a sensor whose transition is already in progress is
//! dropped. Observers are handed a [`StateControl`] rather than sensor
//! references, so callbacks can request transitions without aliasing.

use crate::sensor::Sensor;
use crate::state::{ButtonState, StateChange};

/// Transition requests available to observers and callers.
pub trait StateControl {
    fn sensor_count(&self) -> usize;
    fn state(&self, sensor: usize) -> Option<ButtonState>;
    /// Request a transition through the guarded path; no-op for unknown
    /// sensors, unchanged states and sensors mid-transition.
    fn set_state(&mut self, sensor: usize, state: ButtonState);
}

/// Receives major state changes synchronously, inside the transition.
pub trait StateObserver {
    fn on_major_state_change(&mut self, change: StateChange, control: &mut dyn StateControl);
}

impl<F> StateObserver for F
where
    F: FnMut(StateChange, &mut dyn StateControl),
{
    fn on_major_state_change(&mut self, change: StateChange, control: &mut dyn StateControl) {
        self(change, control);
    }
}

/// Adapter for observers that only want to be told.
pub struct Notify<F>(pub F);

impl<F: FnMut(StateChange)> StateObserver for Notify<F> {
    fn on_major_state_change(&mut self, change: StateChange, _control: &mut dyn StateControl) {
        (self.0)(change);
    }
}

/// Wrap a plain `FnMut(StateChange)` as an observer.
pub fn notify_with<F: FnMut(StateChange)>(f: F) -> Notify<F> {
    Notify(f)
}

/// Sensor arena plus the array-wide flags the state machine consults.
pub struct SensorBank {
    pub(crate) sensors: Vec<Sensor>,
    pub(crate) observer: Option<Box<dyn StateObserver>>,
    pub(crate) any_approached: bool,
    pub(crate) any_pressed: bool,
}

impl std::fmt::Debug for SensorBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorBank")
            .field("sensors", &self.sensors.len())
            .field("observer", &self.observer.is_some())
            .field("any_approached", &self.any_approached)
            .field("any_pressed", &self.any_pressed)
            .finish()
    }
}

impl SensorBank {
    pub(crate) fn new(sensors: Vec<Sensor>) -> Self {
        Self {
            sensors,
            observer: None,
            any_approached: false,
            any_pressed: false,
        }
    }

    /// Run one step of the state machine for `ch` using the current delta.
    pub(crate) fn advance(&mut self, ch: usize) {
        let (any_approached, any_pressed) = (self.any_approached, self.any_pressed);
        let Some(s) = self.sensors.get_mut(ch) else {
            return;
        };
        let t = s.time_in_state();
        let cfg = s.config;
        let enabled = cfg.state_machine;

        let next = match s.state {
            ButtonState::PreCalibrating => {
                (t >= cfg.pre_calibration_ms).then_some(ButtonState::Calibrating)
            }
            ButtonState::Calibrating => {
                if s.stats.counter < cfg.counter_cap() || t < cfg.calibration_ms {
                    s.update_average(any_approached, any_pressed);
                    None
                } else {
                    Some(ButtonState::NoisePowerMeasurement)
                }
            }
            ButtonState::NoisePowerMeasurement => {
                if cfg.noise_measurement && t < cfg.calibration_ms {
                    s.update_average(any_approached, any_pressed);
                    None
                } else {
                    Some(ButtonState::Released)
                }
            }
            ButtonState::Released => {
                if enabled && s.is_approached_now() {
                    Some(ButtonState::ReleasedToApproached)
                } else {
                    s.update_average(any_approached, any_pressed);
                    None
                }
            }
            _ if !enabled => None,
            ButtonState::ReleasedToApproached => {
                if !s.is_approached_now() {
                    Some(ButtonState::Released)
                } else {
                    (t >= cfg.hold_times.released_to_approached_ms)
                        .then_some(ButtonState::Approached)
                }
            }
            ButtonState::Approached => {
                if s.is_released_now() {
                    Some(ButtonState::ApproachedToReleased)
                } else if s.is_pressed_now() {
                    Some(ButtonState::ApproachedToPressed)
                } else {
                    (cfg.approached_timeout_ms > 0 && t > cfg.approached_timeout_ms)
                        .then_some(ButtonState::Calibrating)
                }
            }
            ButtonState::ApproachedToPressed => {
                if !s.is_pressed_now() {
                    Some(ButtonState::Approached)
                } else {
                    (t >= cfg.hold_times.approached_to_pressed_ms).then_some(ButtonState::Pressed)
                }
            }
            ButtonState::ApproachedToReleased => {
                if !s.is_released_now() {
                    Some(ButtonState::Approached)
                } else {
                    (t >= cfg.hold_times.approached_to_released_ms)
                        .then_some(ButtonState::Released)
                }
            }
            ButtonState::Pressed => {
                if !s.is_pressed_now() {
                    Some(ButtonState::PressedToApproached)
                } else {
                    (cfg.pressed_timeout_ms > 0 && t > cfg.pressed_timeout_ms)
                        .then_some(ButtonState::Calibrating)
                }
            }
            ButtonState::PressedToApproached => {
                if s.is_pressed_now() {
                    Some(ButtonState::Pressed)
                } else {
                    (t >= cfg.hold_times.pressed_to_approached_ms)
                        .then_some(ButtonState::Approached)
                }
            }
        };

        let Some(next) = next else {
            return;
        };
        self.transition(ch, next);
        if next == ButtonState::NoisePowerMeasurement {
            let s = &mut self.sensors[ch];
            if s.config.manual_offset.is_none() {
                s.stats.offset_value = s.stats.avg;
            }
        }
    }

    /// Guarded transition of `ch` to `new`.
    pub(crate) fn transition(&mut self, ch: usize, new: ButtonState) {
        let Some(s) = self.sensors.get_mut(ch) else {
            return;
        };
        if s.changing {
            tracing::trace!(sensor = ch, requested = %new, "transition in progress, request dropped");
            return;
        }
        let old = s.state;
        if old == new {
            return;
        }
        s.changing = true;

        let mut reset_timer = !matches!(
            (old, new),
            (ButtonState::ApproachedToReleased, ButtonState::Approached)
                | (ButtonState::PressedToApproached, ButtonState::Pressed)
        );

        let masks = s.config.force_calibration;
        let mask = match (old, new) {
            (_, ButtonState::Calibrating) => {
                s.reset_calibration();
                0
            }
            (ButtonState::ApproachedToReleased, ButtonState::Released) => {
                masks.releasing_from_approached
            }
            (ButtonState::ReleasedToApproached, ButtonState::Approached) => {
                masks.approaching_from_released
            }
            (ButtonState::PressedToApproached, ButtonState::Approached) => {
                masks.approaching_from_pressed
            }
            (_, ButtonState::Pressed) => masks.pressing,
            _ => 0,
        };

        let mut target = new;
        if mask != 0 && self.force_calibrate(ch, mask) {
            target = ButtonState::PreCalibrating;
            reset_timer = true;
        }

        let s = &mut self.sensors[ch];
        if reset_timer {
            s.stats.state_changed_at = s.stats.last_sampled_at;
        }
        s.state = target;
        tracing::debug!(sensor = ch, old = %old, new = %target, "state change");

        if ButtonState::is_major_change(old, target) {
            self.notify(StateChange {
                sensor: ch,
                old,
                new: target,
            });
        }
        self.sensors[ch].changing = false;
    }

    /// Drive every sensor in `mask` back to pre-calibration.
    ///
    /// Returns true when `ch` itself is in the mask; the caller then retargets
    /// its own transition instead of recursing into itself.
    fn force_calibrate(&mut self, ch: usize, mask: u32) -> bool {
        let mut own = false;
        let count = self.sensors.len().min(32);
        tracing::info!(sensor = ch, mask = format_args!("{mask:#010x}"), "forced recalibration");
        for n in (0..count).filter(|n| mask & (1u32 << n) != 0) {
            if n == ch {
                own = true;
            } else {
                self.transition(n, ButtonState::PreCalibrating);
            }
            self.sensors[n].forced_cal = true;
        }
        own
    }

    fn notify(&mut self, change: StateChange) {
        // Taken for the duration of the callback: nested transitions it
        // requests are applied but not reported again.
        if let Some(mut observer) = self.observer.take() {
            observer.on_major_state_change(change, self);
            if self.observer.is_none() {
                self.observer = Some(observer);
            }
        }
    }

    pub(crate) fn refresh_summaries(&mut self) {
        let mut any_approached = false;
        let mut any_pressed = false;
        for s in &mut self.sensors {
            s.refresh_summary();
            any_approached |= s.summary.approached;
            any_pressed |= s.summary.pressed;
        }
        self.any_approached = any_approached;
        self.any_pressed = any_pressed;
    }
}

impl StateControl for SensorBank {
    fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    fn state(&self, sensor: usize) -> Option<ButtonState> {
        self.sensors.get(sensor).map(|s| s.state)
    }

    fn set_state(&mut self, sensor: usize, state: ButtonState) {
        self.transition(sensor, state);
    }
}
