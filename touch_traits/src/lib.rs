//! Collaborator contracts for the touch sensor array.
//!
//! The core never touches an electrode, a non-volatile store, a timer or a
//! random generator directly; it goes through the traits defined here.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Sensing technique behind a [`SampleMethod`]. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    ChargeTransfer,
    ResistiveDivider,
    DirectRead,
    Custom,
}

/// One electrode's measurement technique.
///
/// Sampling is infallible: an implementation that cannot read its hardware
/// must still return a defined value.
pub trait SampleMethod {
    fn kind(&self) -> SampleKind {
        SampleKind::Custom
    }

    /// Called once per cycle before the first `sample`.
    fn pre_sample(&mut self) {}

    /// Take one measurement, optionally in inverted polarity.
    fn sample(&mut self, inverted: bool) -> i32;

    /// Called once per cycle after the last `sample`.
    fn post_sample(&mut self) {}

    /// Convert the cycle's raw accumulator into the filtered unit.
    #[allow(clippy::cast_precision_loss)]
    fn to_value(&self, raw: i32) -> f32 {
        raw as f32
    }

    /// Scale `delta` onto `0..=length` given the delta seen at full touch.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn map_delta(&self, delta: f32, full_scale: f32, length: u16) -> u16 {
        if !(full_scale.is_finite() && full_scale > 0.0) || !delta.is_finite() || delta <= 0.0 {
            return 0;
        }
        let scaled = (delta / full_scale) * f32::from(length);
        if scaled >= f32::from(length) {
            length
        } else {
            scaled as u16
        }
    }
}

impl<T: SampleMethod + ?Sized> SampleMethod for Box<T> {
    fn kind(&self) -> SampleKind {
        (**self).kind()
    }
    fn pre_sample(&mut self) {
        (**self).pre_sample();
    }
    fn sample(&mut self, inverted: bool) -> i32 {
        (**self).sample(inverted)
    }
    fn post_sample(&mut self) {
        (**self).post_sample();
    }
    fn to_value(&self, raw: i32) -> f32 {
        (**self).to_value(raw)
    }
    fn map_delta(&self, delta: f32, full_scale: f32, length: u16) -> u16 {
        (**self).map_delta(delta, full_scale, length)
    }
}

/// Byte-addressable non-volatile store (EEPROM or an image of one).
pub trait ByteStore {
    fn read(&self, addr: usize) -> u8;
    fn write(&mut self, addr: usize, value: u8);
    fn capacity(&self) -> usize;

    /// Write only when the stored byte differs, sparing erase cycles.
    fn update(&mut self, addr: usize, value: u8) {
        if self.read(addr) != value {
            self.write(addr, value);
        }
    }
}

/// Seedable pseudo-random source used to shuffle the scan order.
pub trait RandomSource {
    fn seed(&mut self, seed: u32);

    /// Uniform-ish value in `0..bound`; returns 0 when `bound` is 0.
    fn below(&mut self, bound: u32) -> u32;
}
