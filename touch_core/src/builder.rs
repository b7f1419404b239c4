//! Type-state builder for `TouchArray`.
//!
//! `build()` becomes available once the number of measurements per sensor is
//! set; `try_build()` is always available and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;

use touch_traits::{ByteStore, Clock, MonotonicClock, RandomSource, SampleMethod};

use crate::array::{AttachedStore, TouchArray};
use crate::error::{BuildError, Result};
use crate::machine::{SensorBank, StateObserver};
use crate::persist::MAX_SENSORS;
use crate::rng::ParkMiller;
use crate::schedule::ScanOrder;
use crate::sensor::{Sensor, SensorConfig};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `TouchArray`. All fields are validated on `build()`.
pub struct TouchArrayBuilder<M> {
    sensors: Vec<(Box<dyn SampleMethod>, SensorConfig)>,
    measurements_per_sensor: Option<usize>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    random: Option<Box<dyn RandomSource>>,
    scan_order: Option<Vec<u8>>,
    observer: Option<Box<dyn StateObserver>>,
    store: Option<(Box<dyn ByteStore>, usize)>,
    load_on_build: bool,
    _m: PhantomData<M>,
}

impl Default for TouchArrayBuilder<Missing> {
    fn default() -> Self {
        Self {
            sensors: Vec::new(),
            measurements_per_sensor: None,
            clock: None,
            random: None,
            scan_order: None,
            observer: None,
            store: None,
            load_on_build: false,
            _m: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<M> TouchArrayBuilder<M> {
    /// Append a sensor with default configuration.
    pub fn add_sensor(self, method: impl SampleMethod + 'static) -> Self {
        let electrode = u32::try_from(self.sensors.len()).unwrap_or(u32::MAX);
        self.add_sensor_with(method, SensorConfig::with_electrode(electrode))
    }

    pub fn add_sensor_with(
        mut self,
        method: impl SampleMethod + 'static,
        config: SensorConfig,
    ) -> Self {
        self.sensors.push((Box::new(method), config));
        self
    }

    pub fn add_boxed_sensor(mut self, method: Box<dyn SampleMethod>, config: SensorConfig) -> Self {
        self.sensors.push((method, config));
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shuffle source for the scan order; defaults to `ParkMiller`.
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Use a fixed scan order instead of the seeded shuffle.
    pub fn with_scan_order(mut self, slots: Vec<u8>) -> Self {
        self.scan_order = Some(slots);
        self
    }

    pub fn with_observer(mut self, observer: impl StateObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Attach a settings store; the record lives at `offset`.
    pub fn with_store(mut self, store: impl ByteStore + 'static, offset: usize) -> Self {
        self.store = Some((Box::new(store), offset));
        self
    }

    /// Read saved settings from the attached store during `build()`.
    pub fn load_settings_on_build(mut self, load: bool) -> Self {
        self.load_on_build = load;
        self
    }

    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<TouchArray> {
        let per_sensor = self.measurements_per_sensor.ok_or_else(|| {
            eyre::Report::new(BuildError::InvalidConfig(
                "measurements per sensor not set",
            ))
        })?;
        validate_and_build(self, per_sensor)
    }
}

impl<M> std::fmt::Debug for TouchArrayBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TouchArrayBuilder")
            .field("sensors", &self.sensors.len())
            .field("measurements_per_sensor", &self.measurements_per_sensor)
            .field("custom_scan_order", &self.scan_order.is_some())
            .field("store", &self.store.as_ref().map(|(_, offset)| offset))
            .field("load_on_build", &self.load_on_build)
            .finish_non_exhaustive()
    }
}

// Setter that advances type-state
impl TouchArrayBuilder<Missing> {
    pub fn measurements_per_sensor(self, n: usize) -> TouchArrayBuilder<Set> {
        TouchArrayBuilder {
            sensors: self.sensors,
            measurements_per_sensor: Some(n),
            clock: self.clock,
            random: self.random,
            scan_order: self.scan_order,
            observer: self.observer,
            store: self.store,
            load_on_build: self.load_on_build,
            _m: PhantomData,
        }
    }
}

impl TouchArrayBuilder<Set> {
    pub fn build(self) -> Result<TouchArray> {
        self.try_build()
    }
}

/// Validate configuration and construct the array.
fn validate_and_build<M>(b: TouchArrayBuilder<M>, per_sensor: usize) -> Result<TouchArray> {
    // ── Validation ───────────────────────────────────────────────────────────
    let n = b.sensors.len();
    if n == 0 {
        return Err(eyre::Report::new(BuildError::NoSensors));
    }
    if n > MAX_SENSORS {
        return Err(eyre::Report::new(BuildError::TooManySensors(n)));
    }
    if b.load_on_build && b.store.is_none() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "loading settings on build requires a store",
        )));
    }
    if per_sensor == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "measurements per sensor must be >= 1",
        )));
    }
    for (ch, (_, cfg)) in b.sensors.iter().enumerate() {
        if cfg.filter_coeff == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "filter_coeff must be >= 1",
            )));
        }
        if !cfg.thresholds.is_finite() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "thresholds must be finite",
            )));
        }
        if !cfg.thresholds.is_ordered() {
            tracing::warn!(
                sensor = ch,
                thresholds = ?cfg.thresholds,
                "release thresholds above entry thresholds; states may oscillate"
            );
        }
    }

    // ── Schedule ─────────────────────────────────────────────────────────────
    let scan_order = match b.scan_order {
        Some(slots) => ScanOrder::custom(slots, n),
        None => {
            let mut random = b
                .random
                .unwrap_or_else(|| Box::new(ParkMiller::default()));
            ScanOrder::build(n, per_sensor, random.as_mut())
        }
    }
    .map_err(|e| eyre::Report::new(BuildError::Schedule(e)))?;

    // ── Assemble ─────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match b.clock {
        Some(c) => Arc::from(c),
        None => Arc::new(MonotonicClock::new()),
    };
    let now = clock.now_ms();

    let (methods, sensors): (Vec<_>, Vec<_>) = b
        .sensors
        .into_iter()
        .map(|(m, cfg)| (m, Sensor::new(cfg, now)))
        .unzip();
    let mut bank = SensorBank::new(sensors);
    bank.observer = b.observer;

    let mut array = TouchArray {
        bank,
        methods,
        scan_order,
        measurements_per_sensor: per_sensor,
        clock,
        store: b
            .store
            .map(|(store, offset)| AttachedStore { store, offset }),
        error: None,
    };
    tracing::debug!(
        sensors = n,
        per_sensor,
        scan_len = array.scan_order.len(),
        "touch array built"
    );

    if b.load_on_build {
        // Failure is latched on the array and sampling proceeds on defaults.
        if let Err(e) = array.load_settings() {
            tracing::warn!(error = %e, "saved settings not applied, using defaults");
        }
    }
    Ok(array)
}
