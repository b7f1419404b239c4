#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core touch sensing logic (hardware-agnostic).
//!
//! This crate turns repeated raw electrode measurements into debounced
//! released / approached / pressed states. All hardware interactions go
//! through the `touch_traits` collaborator traits.
//!
//! ## Architecture
//!
//! - **Schedule**: seeded shuffle of scan visits per cycle (`schedule`)
//! - **Filter**: accumulation, running average, noise power, delta (`filter`)
//! - **State machine**: ten-state debounce and calibration (`machine`, `state`)
//! - **Persistence**: CRC-checked threshold record in a byte store (`persist`)
//! - **Controller**: `TouchArray`, built through `TouchArrayBuilder`
//!
//! ## Timing
//!
//! Time is a wrapping `u32` millisecond counter; every elapsed-time check uses
//! wrapping subtraction, so timers survive one wrap of the clock.

pub mod array;
pub mod builder;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod machine;
pub mod mocks;
pub mod persist;
pub mod rng;
pub mod schedule;
pub mod sensor;
pub mod state;

pub use array::{CycleStatus, TouchArray};
pub use builder::TouchArrayBuilder;
pub use error::{BuildError, TouchError};
pub use machine::{Notify, StateControl, StateObserver, notify_with};
pub use persist::Settings;
pub use rng::ParkMiller;
pub use schedule::ScanOrder;
pub use sensor::{
    ForceCalibration, HoldTimes, Polarity, SampleType, Sensor, SensorConfig, SensorStats,
    Thresholds,
};
pub use state::{ButtonState, StateChange, Summary};
