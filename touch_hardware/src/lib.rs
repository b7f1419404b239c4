//! Simulated electrodes and byte stores for running the touch array off-target.
//!
//! - `SimulatedElectrode`: baseline plus deterministic noise plus a shared
//!   touch level that tests and touch scripts drive
//! - `MemoryStore`: RAM-backed EEPROM
//! - `FileStore`: EEPROM image on disk, written back atomically on `flush`

pub mod error;
pub mod store;

pub use error::{HwError, Result};
pub use store::{FileStore, MemoryStore, write_atomic};

use std::cell::Cell;
use std::rc::Rc;

use touch_traits::{SampleKind, SampleMethod};

/// Extra signal on a simulated electrode; clones share the same level.
#[derive(Debug, Clone, Default)]
pub struct TouchLevel(Rc<Cell<i32>>);

impl TouchLevel {
    pub fn set(&self, level: i32) {
        self.0.set(level);
    }

    pub fn get(&self) -> i32 {
        self.0.get()
    }
}

/// Simulated electrode
pub struct SimulatedElectrode {
    baseline: i32,
    noise: i32,
    touch: TouchLevel,
    rng: u32,
    kind: SampleKind,
}

impl SimulatedElectrode {
    /// Electrode reading `baseline` plus up to `±noise` per sample.
    pub fn new(baseline: i32, noise: u16, seed: u32) -> Self {
        Self {
            baseline,
            noise: i32::from(noise),
            touch: TouchLevel::default(),
            rng: seed.max(1),
            kind: SampleKind::ChargeTransfer,
        }
    }

    pub fn with_kind(mut self, kind: SampleKind) -> Self {
        self.kind = kind;
        self
    }

    /// Handle for driving this electrode's touch level from outside.
    pub fn touch(&self) -> TouchLevel {
        self.touch.clone()
    }

    // xorshift32
    fn next_noise(&mut self) -> i32 {
        if self.noise == 0 {
            return 0;
        }
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let span = u32::try_from(2 * self.noise + 1).unwrap_or(1);
        i32::try_from(x % span).unwrap_or(0) - self.noise
    }
}

impl SampleMethod for SimulatedElectrode {
    fn kind(&self) -> SampleKind {
        self.kind
    }

    fn sample(&mut self, _inverted: bool) -> i32 {
        // Both polarities see the same signal; a differential pair sums them.
        let v = self
            .baseline
            .saturating_add(self.touch.get())
            .saturating_add(self.next_noise());
        tracing::trace!(value = v, "simulated sample");
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_electrode_follows_touch_level() {
        let mut e = SimulatedElectrode::new(500, 0, 7);
        let touch = e.touch();
        assert_eq!(e.sample(false), 500);
        touch.set(40);
        assert_eq!(e.sample(true), 540);
        assert_eq!(e.kind(), SampleKind::ChargeTransfer);
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let mut e = SimulatedElectrode::new(0, 3, 42);
        let samples: Vec<i32> = (0..1000).map(|_| e.sample(false)).collect();
        assert!(samples.iter().all(|v| (-3..=3).contains(v)));
        assert!(samples.iter().any(|&v| v != samples[0]));
    }

    #[test]
    fn same_seed_same_noise() {
        let mut a = SimulatedElectrode::new(0, 10, 9);
        let mut b = SimulatedElectrode::new(0, 10, 9);
        for _ in 0..50 {
            assert_eq!(a.sample(false), b.sample(false));
        }
    }
}
