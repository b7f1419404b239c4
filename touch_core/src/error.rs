use thiserror::Error;

/// Legacy status codes reported through [`TouchError::code`].
pub mod code {
    pub const OK: i8 = 0;
    /// Invalid configuration or scan order.
    pub const CONFIG: i8 = -1;
    /// Store I/O class failure: foreign data, bad key/version/count, checksum.
    pub const IO: i8 = -5;
    /// Record does not fit in the store.
    pub const NO_SPACE: i8 = -28;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TouchError {
    #[error("scan order has no free slot for sensor {sensor}")]
    ScheduleFull { sensor: usize },
    #[error("invalid scan order: {0}")]
    ScanOrder(&'static str),
    #[error("settings record needs {required} bytes at offset {offset}, store holds {capacity}")]
    NoSpace {
        offset: usize,
        required: usize,
        capacity: usize,
    },
    #[error("sensor count {0} does not fit the settings descriptor")]
    CountOutOfRange(usize),
    #[error("store region holds foreign data (first byte {found:#04x})")]
    ForeignData { found: u8 },
    #[error("settings key missing (found {found:#04x})")]
    KeyMissing { found: u8 },
    #[error("unsupported settings format version {0}")]
    FormatVersion(u8),
    #[error("stored sensor count {stored} does not match configured {configured}")]
    SensorCount { stored: usize, configured: usize },
    #[error("settings checksum mismatch (stored {stored:#06x}, computed {computed:#06x})")]
    Checksum { stored: u16, computed: u16 },
    #[error("no settings store attached")]
    NoStore,
}

impl TouchError {
    /// Stable numeric code; always negative.
    pub const fn code(&self) -> i8 {
        match self {
            Self::ScheduleFull { .. } | Self::ScanOrder(_) | Self::NoStore => code::CONFIG,
            Self::NoSpace { .. } | Self::CountOutOfRange(_) => code::NO_SPACE,
            Self::ForeignData { .. }
            | Self::KeyMissing { .. }
            | Self::FormatVersion(_)
            | Self::SensorCount { .. }
            | Self::Checksum { .. } => code::IO,
        }
    }

    /// True for failures of the settings record rather than of the schedule.
    pub const fn is_persistence(&self) -> bool {
        !matches!(self, Self::ScheduleFull { .. } | Self::ScanOrder(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no sensors configured")]
    NoSensors,
    #[error("too many sensors: {0} (at most 32)")]
    TooManySensors(usize),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Schedule(#[from] TouchError),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_legacy_values() {
        assert_eq!(TouchError::ScheduleFull { sensor: 1 }.code(), -1);
        assert_eq!(
            TouchError::NoSpace {
                offset: 0,
                required: 69,
                capacity: 64
            }
            .code(),
            -28
        );
        assert_eq!(
            TouchError::Checksum {
                stored: 1,
                computed: 2
            }
            .code(),
            -5
        );
        assert_eq!(TouchError::ForeignData { found: 0x12 }.code(), -5);
    }

    #[test]
    fn schedule_errors_are_not_persistence() {
        assert!(!TouchError::ScheduleFull { sensor: 0 }.is_persistence());
        assert!(TouchError::FormatVersion(3).is_persistence());
    }
}
