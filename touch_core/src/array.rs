//! The sensor array controller: one sampling cycle end to end.

use std::sync::Arc;

use touch_traits::{ByteStore, Clock, SampleMethod};

use crate::builder::{Missing, TouchArrayBuilder};
use crate::error::{TouchError, code};
use crate::machine::{SensorBank, StateObserver};
use crate::persist::{self, Settings};
use crate::schedule::ScanOrder;
use crate::sensor::{SampleType, Sensor, SensorConfig};
use crate::state::ButtonState;

/// Outcome of [`TouchArray::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStatus {
    Ok,
    /// Sampling ran, but a persistence error is latched.
    Degraded(TouchError),
}

impl CycleStatus {
    pub const fn code(&self) -> i8 {
        match self {
            Self::Ok => code::OK,
            Self::Degraded(e) => e.code(),
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

pub(crate) struct AttachedStore {
    pub(crate) store: Box<dyn ByteStore>,
    pub(crate) offset: usize,
}

pub struct TouchArray {
    pub(crate) bank: SensorBank,
    pub(crate) methods: Vec<Box<dyn SampleMethod>>,
    pub(crate) scan_order: ScanOrder,
    pub(crate) measurements_per_sensor: usize,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) store: Option<AttachedStore>,
    pub(crate) error: Option<TouchError>,
}

impl core::fmt::Debug for TouchArray {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TouchArray")
            .field("sensors", &self.bank.sensors.len())
            .field("measurements_per_sensor", &self.measurements_per_sensor)
            .field("any_approached", &self.bank.any_approached)
            .field("any_pressed", &self.bank.any_pressed)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl TouchArray {
    /// Start building an array.
    pub fn builder() -> TouchArrayBuilder<Missing> {
        TouchArrayBuilder::default()
    }

    /// Sample every sensor per the scan order, then advance every state machine.
    pub fn run_cycle(&mut self) -> CycleStatus {
        for s in &mut self.bank.sensors {
            s.reset_accumulator();
        }
        for m in &mut self.methods {
            m.pre_sample();
        }

        for ch in self.scan_order.iter() {
            let (Some(sensor), Some(method)) =
                (self.bank.sensors.get_mut(ch), self.methods.get_mut(ch))
            else {
                continue;
            };
            let ty = sensor.config.sample_type;
            let normal = if ty.includes_normal() {
                method.sample(false)
            } else {
                0
            };
            let inverted = if ty.includes_inverted() {
                method.sample(true)
            } else {
                0
            };
            // Single-polarity visits count twice to match differential scale.
            let sum = match ty {
                SampleType::Normal => normal.saturating_mul(2),
                SampleType::Inverted => inverted.saturating_mul(2),
                SampleType::Differential => normal.saturating_add(inverted),
            };
            sensor.accumulate(sum);
        }

        let now = self.clock.now_ms();
        for (s, m) in self.bank.sensors.iter_mut().zip(self.methods.iter_mut()) {
            m.post_sample();
            s.stats.value = m.to_value(s.stats.raw);
            s.stats.last_sampled_at = now;
        }

        for ch in 0..self.bank.sensors.len() {
            self.bank.sensors[ch].compute_delta();
            self.bank.advance(ch);
        }
        self.bank.refresh_summaries();

        tracing::trace!(
            now_ms = now,
            any_approached = self.bank.any_approached,
            any_pressed = self.bank.any_pressed,
            "cycle complete"
        );
        self.status()
    }

    pub fn status(&self) -> CycleStatus {
        self.error
            .clone()
            .map_or(CycleStatus::Ok, CycleStatus::Degraded)
    }

    /// Latched error, if any.
    pub fn error(&self) -> Option<&TouchError> {
        self.error.as_ref()
    }

    pub fn error_code(&self) -> i8 {
        self.error.as_ref().map_or(code::OK, TouchError::code)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn sensor_count(&self) -> usize {
        self.bank.sensors.len()
    }

    pub fn measurements_per_sensor(&self) -> usize {
        self.measurements_per_sensor
    }

    pub fn scan_order(&self) -> &ScanOrder {
        &self.scan_order
    }

    pub fn sensor(&self, ch: usize) -> Option<&Sensor> {
        self.bank.sensors.get(ch)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.bank.sensors.iter()
    }

    /// Mutable access to a sensor's configuration; takes effect next cycle.
    pub fn config_mut(&mut self, ch: usize) -> Option<&mut SensorConfig> {
        self.bank.sensors.get_mut(ch).map(|s| &mut s.config)
    }

    pub fn state(&self, ch: usize) -> Option<ButtonState> {
        self.sensor(ch).map(Sensor::state)
    }

    /// Label of the state as of the last cycle; `"Invalid"` for unknown sensors.
    pub fn label(&self, ch: usize) -> &'static str {
        self.sensor(ch).map_or("Invalid", Sensor::label)
    }

    pub fn is_calibrating(&self, ch: usize) -> bool {
        self.sensor(ch).is_some_and(|s| s.summary.calibrating)
    }

    pub fn is_released(&self, ch: usize) -> bool {
        self.sensor(ch).is_some_and(|s| s.summary.released)
    }

    pub fn is_approached(&self, ch: usize) -> bool {
        self.sensor(ch).is_some_and(|s| s.summary.approached)
    }

    pub fn is_pressed(&self, ch: usize) -> bool {
        self.sensor(ch).is_some_and(|s| s.summary.pressed)
    }

    pub fn any_calibrating(&self) -> bool {
        self.bank.sensors.iter().any(|s| s.summary.calibrating)
    }

    pub fn any_approached(&self) -> bool {
        self.bank.any_approached
    }

    pub fn any_pressed(&self) -> bool {
        self.bank.any_pressed
    }

    /// Request a transition through the same guarded path the cycle uses.
    pub fn set_state(&mut self, ch: usize, state: ButtonState) {
        self.bank.transition(ch, state);
    }

    /// Send every sensor in `mask` back to pre-calibration.
    pub fn force_calibration(&mut self, mask: u32) {
        let count = self.bank.sensors.len().min(32);
        for n in (0..count).filter(|n| mask & (1u32 << n) != 0) {
            self.bank.transition(n, ButtonState::PreCalibrating);
            self.bank.sensors[n].forced_cal = true;
        }
    }

    pub fn set_observer(&mut self, observer: impl StateObserver + 'static) {
        self.bank.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.bank.observer = None;
    }

    /// Delta of `ch` scaled onto `0..=length` by its sample method.
    pub fn map_delta(&self, ch: usize, length: u16) -> Option<u16> {
        let s = self.bank.sensors.get(ch)?;
        let m = self.methods.get(ch)?;
        let full_scale = if s.config.full_scale_delta > 0.0 {
            s.config.full_scale_delta
        } else {
            s.stats.max_delta
        };
        Some(m.map_delta(s.stats.delta, full_scale, length))
    }

    /// Current persisted subset. The slew flag is set only when every sensor
    /// has the limiter enabled.
    pub fn settings(&self) -> Settings {
        Settings {
            slew_limiter: self.bank.sensors.iter().all(|s| s.config.slew_limiter),
            thresholds: self
                .bank
                .sensors
                .iter()
                .map(|s| s.config.thresholds)
                .collect(),
        }
    }

    /// Apply decoded settings to every sensor.
    pub fn apply_settings(&mut self, settings: &Settings) {
        for (s, t) in self.bank.sensors.iter_mut().zip(&settings.thresholds) {
            s.config.thresholds = *t;
            s.config.slew_limiter = settings.slew_limiter;
        }
    }

    /// Load settings from `store`; `Ok(false)` when nothing was saved there.
    ///
    /// Failures are latched and leave the in-memory settings untouched.
    pub fn load_settings_from(
        &mut self,
        store: &dyn ByteStore,
        offset: usize,
    ) -> Result<bool, TouchError> {
        match persist::read_settings(store, offset, self.sensor_count()) {
            Ok(Some(settings)) => {
                self.apply_settings(&settings);
                tracing::info!(offset, sensors = self.sensor_count(), "settings loaded");
                Ok(true)
            }
            Ok(None) => {
                tracing::info!(offset, "no saved settings, keeping defaults");
                Ok(false)
            }
            Err(e) => Err(self.latch(e, "load")),
        }
    }

    /// Save the current settings to `store`. Failures are latched.
    pub fn save_settings_to(
        &mut self,
        store: &mut dyn ByteStore,
        offset: usize,
    ) -> Result<(), TouchError> {
        match persist::write_settings(store, offset, &self.settings()) {
            Ok(()) => {
                tracing::info!(offset, sensors = self.sensor_count(), "settings saved");
                Ok(())
            }
            Err(e) => Err(self.latch(e, "save")),
        }
    }

    /// Load from the store attached at build time.
    pub fn load_settings(&mut self) -> Result<bool, TouchError> {
        let Some(attached) = self.store.take() else {
            return Err(self.latch(TouchError::NoStore, "load"));
        };
        let res = self.load_settings_from(attached.store.as_ref(), attached.offset);
        self.store = Some(attached);
        res
    }

    /// Save to the store attached at build time.
    pub fn save_settings(&mut self) -> Result<(), TouchError> {
        let Some(mut attached) = self.store.take() else {
            return Err(self.latch(TouchError::NoStore, "save"));
        };
        let res = self.save_settings_to(attached.store.as_mut(), attached.offset);
        self.store = Some(attached);
        res
    }

    pub fn store(&self) -> Option<&dyn ByteStore> {
        self.store.as_ref().map(|a| a.store.as_ref())
    }

    fn latch(&mut self, e: TouchError, op: &'static str) -> TouchError {
        tracing::warn!(error = %e, code = e.code(), op, "settings {op} failed");
        self.error = Some(e.clone());
        e
    }
}
