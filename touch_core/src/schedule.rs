//! Measurement schedule: the order in which electrodes are visited in a cycle.
//!
//! A shuffled order spreads each sensor's samples across the cycle so that
//! periodic interference does not always hit the same electrode.

use std::fmt;

use touch_traits::RandomSource;

use crate::error::TouchError;

/// Marker for a slot that has not been assigned yet.
pub const EMPTY_SLOT: u8 = u8::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOrder {
    slots: Vec<u8>,
    sensors: usize,
}

impl ScanOrder {
    /// Seeded shuffle giving every sensor exactly `per_sensor` slots.
    ///
    /// The generator is seeded with `per_sensor`, so the order is a pure
    /// function of the two counts and the generator.
    pub fn build(
        sensors: usize,
        per_sensor: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, TouchError> {
        if sensors == 0 || sensors >= usize::from(EMPTY_SLOT) {
            return Err(TouchError::ScanOrder("sensor count out of range"));
        }
        if per_sensor == 0 {
            return Err(TouchError::ScanOrder("measurements per sensor must be >= 1"));
        }
        let len = sensors
            .checked_mul(per_sensor)
            .filter(|l| u32::try_from(*l).is_ok())
            .ok_or(TouchError::ScanOrder("scan order too long"))?;

        let mut slots = vec![EMPTY_SLOT; len];
        rng.seed(u32::try_from(per_sensor).unwrap_or(u32::MAX));
        let bound = u32::try_from(len).unwrap_or(u32::MAX);
        for _round in 0..per_sensor {
            for (sensor, id) in (0..sensors).zip(0u8..) {
                let start = rng.below(bound) as usize;
                let pos = (0..len)
                    .map(|n| (n + start) % len)
                    .find(|&p| slots[p] == EMPTY_SLOT)
                    .ok_or(TouchError::ScheduleFull { sensor })?;
                slots[pos] = id;
            }
        }
        tracing::trace!(sensors, per_sensor, len, "scan order built");
        Ok(Self { slots, sensors })
    }

    /// Caller-provided order; every entry must name an existing sensor.
    pub fn custom(slots: Vec<u8>, sensors: usize) -> Result<Self, TouchError> {
        if slots.is_empty() {
            return Err(TouchError::ScanOrder("custom scan order is empty"));
        }
        if slots.iter().any(|&s| usize::from(s) >= sensors) {
            return Err(TouchError::ScanOrder(
                "custom scan order names a sensor that does not exist",
            ));
        }
        Ok(Self { slots, sensors })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|&s| usize::from(s))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn sensors(&self) -> usize {
        self.sensors
    }

    /// Number of visits per cycle for `sensor`.
    pub fn visits(&self, sensor: usize) -> usize {
        self.iter().filter(|&s| s == sensor).count()
    }
}

impl fmt::Display for ScanOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{s}")?;
        }
        Ok(())
    }
}
