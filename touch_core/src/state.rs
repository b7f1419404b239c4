//! Button states and the rules that classify transitions between them.

use std::fmt;

/// Per-sensor debounce/calibration state.
///
/// The declaration order is significant: summaries and the averaging freeze
/// compare states by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ButtonState {
    #[default]
    PreCalibrating = 0,
    Calibrating = 1,
    NoisePowerMeasurement = 2,
    Released = 3,
    ReleasedToApproached = 4,
    Approached = 5,
    ApproachedToPressed = 6,
    ApproachedToReleased = 7,
    Pressed = 8,
    PressedToApproached = 9,
}

const LABELS: [&str; 10] = [
    "PreCalibrating",
    "Calibrating",
    "NoisePowerMeasurement",
    "Released",
    "ReleasedToApproached",
    "Approached",
    "ApproachedToPressed",
    "ApproachedToReleased",
    "Pressed",
    "PressedToApproached",
];

impl ButtonState {
    pub const ALL: [Self; 10] = [
        Self::PreCalibrating,
        Self::Calibrating,
        Self::NoisePowerMeasurement,
        Self::Released,
        Self::ReleasedToApproached,
        Self::Approached,
        Self::ApproachedToPressed,
        Self::ApproachedToReleased,
        Self::Pressed,
        Self::PressedToApproached,
    ];

    pub const fn label(self) -> &'static str {
        LABELS[self as usize]
    }

    pub fn from_label(label: &str) -> Option<Self> {
        LABELS
            .iter()
            .position(|l| *l == label)
            .map(|i| Self::ALL[i])
    }

    pub const fn is_calibrating(self) -> bool {
        (self as u8) <= Self::NoisePowerMeasurement as u8
    }

    pub const fn is_released(self) -> bool {
        matches!(self, Self::Released | Self::ReleasedToApproached)
    }

    pub const fn is_approached(self) -> bool {
        (self as u8) >= Self::Approached as u8
    }

    pub const fn is_pressed(self) -> bool {
        (self as u8) >= Self::Pressed as u8
    }

    /// Whether `old -> new` is a user-visible change.
    ///
    /// Moves into and back out of a tentative state are not major; neither is
    /// the scheduled step from pre-calibration into calibration.
    pub const fn is_major_change(old: Self, new: Self) -> bool {
        match new {
            Self::PreCalibrating => true,
            Self::Calibrating => !matches!(old, Self::PreCalibrating),
            Self::Released => !matches!(old, Self::ReleasedToApproached),
            Self::Approached => {
                !matches!(old, Self::ApproachedToReleased | Self::ApproachedToPressed)
            }
            Self::Pressed => !matches!(old, Self::PressedToApproached),
            _ => false,
        }
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label for a raw state value; unknown values map to `"Invalid"`.
pub fn label_for(raw: u8) -> &'static str {
    LABELS.get(usize::from(raw)).copied().unwrap_or("Invalid")
}

/// Derived flags refreshed after every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub calibrating: bool,
    pub released: bool,
    pub approached: bool,
    pub pressed: bool,
}

impl From<ButtonState> for Summary {
    fn from(state: ButtonState) -> Self {
        Self {
            calibrating: state.is_calibrating(),
            released: state.is_released(),
            approached: state.is_approached(),
            pressed: state.is_pressed(),
        }
    }
}

/// A major transition delivered to a [`crate::StateObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub sensor: usize,
    pub old: ButtonState,
    pub new: ButtonState,
}
