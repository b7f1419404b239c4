//! `inspect` and `schedule` subcommands.

use std::io::Write;
use std::path::PathBuf;

use eyre::WrapErr;
use serde_json::json;
use touch_config::Config;
use touch_core::persist::{self, record_len};
use touch_core::{ParkMiller, ScanOrder, TouchError};
use touch_hardware::FileStore;

/// Decode the settings record at `offset` of a store image.
///
/// A record that fails its checksum is still printed, then reported as an error.
pub fn run_inspect(
    cfg: &Config,
    image: Option<PathBuf>,
    offset: Option<usize>,
    json: bool,
    out: &mut dyn Write,
) -> eyre::Result<()> {
    let Some(path) = image.or_else(|| cfg.store.image.as_ref().map(PathBuf::from)) else {
        return Err(eyre::Report::new(TouchError::NoStore));
    };
    let offset = offset.unwrap_or(cfg.store.offset);
    let store = FileStore::open(&path, cfg.store.capacity)
        .wrap_err_with(|| format!("open store image {}", path.display()))?;

    let Some(info) = persist::inspect(&store, offset)? else {
        if json {
            writeln!(out, "{}", json!({ "offset": offset, "erased": true }))?;
        } else {
            writeln!(out, "offset {offset}: erased, no settings saved")?;
        }
        return Ok(());
    };

    let thresholds: Option<Vec<[f32; 4]>> = info
        .thresholds
        .as_ref()
        .map(|ts| ts.iter().map(touch_core::Thresholds::as_array).collect());
    if json {
        let line = json!({
            "offset": offset,
            "erased": false,
            "version": info.version,
            "sensors": info.sensors,
            "length": record_len(info.sensors),
            "slew_limiter": info.slew_limiter,
            "stored_crc": info.stored_crc,
            "computed_crc": info.computed_crc,
            "crc_ok": info.crc_ok(),
            "thresholds": thresholds,
        });
        writeln!(out, "{line}")?;
    } else {
        writeln!(
            out,
            "offset {offset}: version {} sensors {} ({} bytes) slew_limiter {}",
            info.version,
            info.sensors,
            record_len(info.sensors),
            info.slew_limiter
        )?;
        let verdict = if info.crc_ok() { "crc ok" } else { "CRC MISMATCH" };
        writeln!(
            out,
            "crc stored {:#06x} computed {:#06x}: {verdict}",
            info.stored_crc, info.computed_crc
        )?;
        for (i, t) in thresholds.iter().flatten().enumerate() {
            writeln!(
                out,
                "  sensor {i}: r2a {} a2r {} a2p {} p2a {}",
                t[0], t[1], t[2], t[3]
            )?;
        }
    }

    if !info.crc_ok() {
        return Err(eyre::Report::new(TouchError::Checksum {
            stored: info.stored_crc,
            computed: info.computed_crc,
        }));
    }
    Ok(())
}

/// Print the seeded scan order for the configured array.
pub fn run_schedule(cfg: &Config, json: bool, out: &mut dyn Write) -> eyre::Result<()> {
    let sensors = cfg.sensors.len();
    let per_sensor = cfg.array.measurements_per_sensor;
    let order = ScanOrder::build(sensors, per_sensor, &mut ParkMiller::default())?;
    if json {
        let line = json!({
            "sensors": sensors,
            "measurements_per_sensor": per_sensor,
            "order": order.as_slice(),
        });
        writeln!(out, "{line}")?;
    } else {
        writeln!(out, "{order}")?;
    }
    Ok(())
}
