#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and touch-script parsing for the touch sensor array.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `[defaults]` holds per-sensor settings shared by every `[[sensors]]`
//!   entry; an entry overrides any field it sets.
//! - Touch scripts (CSV) drive simulated electrodes for offline runs.
use serde::Deserialize;

/// Largest sensor count the settings record can describe.
pub const MAX_SENSORS: usize = 32;
/// Key, descriptor, config and checksum bytes of the settings record.
const RECORD_OVERHEAD: usize = 5;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Increasing,
    Decreasing,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Normal,
    Inverted,
    #[default]
    Differential,
}

/// Per-sensor settings. Every field is optional; unset fields fall back to
/// `[defaults]` and then to the library defaults.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SensorCfg {
    pub electrode: Option<u32>,
    pub polarity: Option<Polarity>,
    pub sample_type: Option<SampleType>,

    pub released_to_approached: Option<f32>,
    pub approached_to_released: Option<f32>,
    pub approached_to_pressed: Option<f32>,
    pub pressed_to_approached: Option<f32>,

    pub released_to_approached_ms: Option<u32>,
    pub approached_to_released_ms: Option<u32>,
    pub approached_to_pressed_ms: Option<u32>,
    pub pressed_to_approached_ms: Option<u32>,

    pub pre_calibration_ms: Option<u32>,
    pub calibration_ms: Option<u32>,
    /// 0 disables the timeout
    pub approached_timeout_ms: Option<u32>,
    /// 0 disables the timeout
    pub pressed_timeout_ms: Option<u32>,
    pub filter_coeff: Option<u16>,

    /// Bitmasks of sensors sent back to pre-calibration on this sensor's transition
    pub force_calibration_when_releasing_from_approached: Option<u32>,
    pub force_calibration_when_approaching_from_released: Option<u32>,
    pub force_calibration_when_approaching_from_pressed: Option<u32>,
    pub force_calibration_when_pressing: Option<u32>,

    pub slew_limiter: Option<bool>,
    pub manual_offset: Option<f32>,
    pub noise_measurement: Option<bool>,
    pub state_machine: Option<bool>,
    pub freeze_when_any_approached: Option<bool>,
    pub freeze_when_any_pressed: Option<bool>,
    pub full_scale_delta: Option<f32>,
}

macro_rules! overlay {
    ($out:ident, $base:ident, $top:ident; $($field:ident),* $(,)?) => {
        $( $out.$field = $top.$field.or($base.$field); )*
    };
}

impl SensorCfg {
    /// Fields set on `self` win over those in `defaults`.
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut out = Self::default();
        overlay!(out, defaults, self;
            electrode, polarity, sample_type,
            released_to_approached, approached_to_released,
            approached_to_pressed, pressed_to_approached,
            released_to_approached_ms, approached_to_released_ms,
            approached_to_pressed_ms, pressed_to_approached_ms,
            pre_calibration_ms, calibration_ms,
            approached_timeout_ms, pressed_timeout_ms, filter_coeff,
            force_calibration_when_releasing_from_approached,
            force_calibration_when_approaching_from_released,
            force_calibration_when_approaching_from_pressed,
            force_calibration_when_pressing,
            slew_limiter, manual_offset, noise_measurement, state_machine,
            freeze_when_any_approached, freeze_when_any_pressed, full_scale_delta,
        );
        out
    }

    fn thresholds(&self) -> [(&'static str, Option<f32>); 4] {
        [
            ("released_to_approached", self.released_to_approached),
            ("approached_to_released", self.approached_to_released),
            ("approached_to_pressed", self.approached_to_pressed),
            ("pressed_to_approached", self.pressed_to_approached),
        ]
    }

    fn masks(&self) -> [(&'static str, Option<u32>); 4] {
        [
            (
                "force_calibration_when_releasing_from_approached",
                self.force_calibration_when_releasing_from_approached,
            ),
            (
                "force_calibration_when_approaching_from_released",
                self.force_calibration_when_approaching_from_released,
            ),
            (
                "force_calibration_when_approaching_from_pressed",
                self.force_calibration_when_approaching_from_pressed,
            ),
            (
                "force_calibration_when_pressing",
                self.force_calibration_when_pressing,
            ),
        ]
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ArrayCfg {
    pub measurements_per_sensor: usize,
    /// Overrides every sensor's slew limiter when set
    pub slew_limiter: Option<bool>,
}

impl Default for ArrayCfg {
    fn default() -> Self {
        Self {
            measurements_per_sensor: 8,
            slew_limiter: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreCfg {
    /// EEPROM image file used by the simulator
    pub image: Option<String>,
    pub capacity: usize,
    pub offset: usize,
    pub load_on_start: bool,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            image: None,
            capacity: 1024,
            offset: 0,
            load_on_start: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub array: ArrayCfg,
    #[serde(default)]
    pub store: StoreCfg,
    /// Settings applied to every sensor unless overridden
    #[serde(default)]
    pub defaults: SensorCfg,
    #[serde(default)]
    pub sensors: Vec<SensorCfg>,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Per-sensor settings with `[defaults]` folded in.
    pub fn effective_sensors(&self) -> Vec<SensorCfg> {
        self.sensors
            .iter()
            .map(|s| s.merged_over(&self.defaults))
            .collect()
    }

    /// Bytes the settings record occupies for this sensor count.
    pub fn record_len(&self) -> usize {
        RECORD_OVERHEAD + 16 * self.sensors.len()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Array
        let n = self.sensors.len();
        if n == 0 {
            eyre::bail!("at least one [[sensors]] entry is required");
        }
        if n > MAX_SENSORS {
            eyre::bail!("too many sensors: {n} (at most {MAX_SENSORS})");
        }
        if self.array.measurements_per_sensor == 0 {
            eyre::bail!("array.measurements_per_sensor must be >= 1");
        }
        if self.array.measurements_per_sensor > 255 {
            eyre::bail!("array.measurements_per_sensor must be <= 255");
        }

        // Store
        if self.store.capacity == 0 {
            eyre::bail!("store.capacity must be > 0");
        }
        if self.store.offset.saturating_add(self.record_len()) > self.store.capacity {
            eyre::bail!(
                "store.capacity too small: settings for {n} sensors need {} bytes at offset {}",
                self.record_len(),
                self.store.offset
            );
        }

        // Sensors
        let valid_mask = if n >= 32 { u32::MAX } else { (1u32 << n) - 1 };
        for (i, s) in self.effective_sensors().iter().enumerate() {
            if s.filter_coeff == Some(0) {
                eyre::bail!("sensors[{i}].filter_coeff must be >= 1");
            }
            for (name, v) in s.thresholds() {
                if v.is_some_and(|v| !v.is_finite()) {
                    eyre::bail!("sensors[{i}].{name} must be finite");
                }
            }
            if let (Some(enter), Some(leave)) = (s.released_to_approached, s.approached_to_released) {
                if leave > enter {
                    eyre::bail!(
                        "sensors[{i}].approached_to_released ({leave}) must be <= released_to_approached ({enter})"
                    );
                }
            }
            if let (Some(enter), Some(leave)) = (s.approached_to_pressed, s.pressed_to_approached) {
                if leave > enter {
                    eyre::bail!(
                        "sensors[{i}].pressed_to_approached ({leave}) must be <= approached_to_pressed ({enter})"
                    );
                }
            }
            if let (Some(approach), Some(press)) = (s.released_to_approached, s.approached_to_pressed) {
                if press < approach {
                    eyre::bail!(
                        "sensors[{i}].approached_to_pressed ({press}) must be >= released_to_approached ({approach})"
                    );
                }
            }
            for (name, mask) in s.masks() {
                if mask.is_some_and(|m| m & !valid_mask != 0) {
                    eyre::bail!("sensors[{i}].{name} names a sensor index >= {n}");
                }
            }
            if s.full_scale_delta.is_some_and(|v| !v.is_finite() || v < 0.0) {
                eyre::bail!("sensors[{i}].full_scale_delta must be >= 0");
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
            }
        }
        Ok(())
    }
}

/// Touch-script CSV row.
///
/// Expected headers:
/// at_ms,sensor,level
///
/// Example:
/// at_ms,sensor,level
/// 1000,0,400
/// 1200,0,0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    /// Time since start of the run
    pub at_ms: u32,
    pub sensor: usize,
    /// Added to the electrode's baseline from `at_ms` on
    pub level: i32,
}

/// Load a touch script; rows must be in non-decreasing time order.
pub fn load_touch_script_csv(path: &std::path::Path) -> eyre::Result<Vec<TouchEvent>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open touch script {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["at_ms", "sensor", "level"];
    let actual: Vec<String> = headers.iter().map(str::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "touch script CSV must have headers 'at_ms,sensor,level', got: {}",
            actual.join(",")
        );
    }

    let mut events: Vec<TouchEvent> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TouchEvent>().enumerate() {
        let ev = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if events.last().is_some_and(|prev| ev.at_ms < prev.at_ms) {
            eyre::bail!("touch script row {} goes back in time", idx + 2);
        }
        events.push(ev);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let defaults = SensorCfg {
            released_to_approached: Some(30.0),
            filter_coeff: Some(8),
            ..SensorCfg::default()
        };
        let own = SensorCfg {
            released_to_approached: Some(45.0),
            electrode: Some(3),
            ..SensorCfg::default()
        };
        let m = own.merged_over(&defaults);
        assert_eq!(m.released_to_approached, Some(45.0));
        assert_eq!(m.filter_coeff, Some(8));
        assert_eq!(m.electrode, Some(3));
        assert_eq!(m.polarity, None);
    }

    #[test]
    fn record_len_grows_per_sensor() {
        let cfg = load_toml("[[sensors]]\n[[sensors]]\n").unwrap();
        assert_eq!(cfg.record_len(), 37);
    }
}
