//! Human-readable error descriptions and structured JSON error formatting.

use touch_core::{BuildError, TouchError};
use touch_hardware::HwError;

/// Stable short name for a settings/schedule error, used in JSON output.
pub fn touch_error_name(e: &TouchError) -> &'static str {
    match e {
        TouchError::ScheduleFull { .. } => "ScheduleFull",
        TouchError::ScanOrder(_) => "ScanOrder",
        TouchError::NoSpace { .. } => "NoSpace",
        TouchError::CountOutOfRange(_) => "CountOutOfRange",
        TouchError::ForeignData { .. } => "ForeignData",
        TouchError::KeyMissing { .. } => "KeyMissing",
        TouchError::FormatVersion(_) => "FormatVersion",
        TouchError::SensorCount { .. } => "SensorCount",
        TouchError::Checksum { .. } => "Checksum",
        TouchError::NoStore => "NoStore",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::NoSensors => {
                "What happened: The array has no sensors.\nLikely causes: The config has no [[sensors]] entries.\nHow to fix: Add one [[sensors]] table per electrode.".to_string()
            }
            BuildError::TooManySensors(n) => format!(
                "What happened: {n} sensors configured; the array supports at most 32.\nLikely causes: Extra [[sensors]] entries.\nHow to fix: Remove entries or split the electrodes across arrays."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            BuildError::Schedule(e) => format!(
                "What happened: The scan order could not be built ({e}).\nLikely causes: Inconsistent sensor and measurement counts.\nHow to fix: Check array.measurements_per_sensor and the number of [[sensors]]."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TouchError>() {
        return match te {
            TouchError::Checksum { .. } => format!(
                "What happened: {te}.\nLikely causes: The store image was corrupted or partially written.\nHow to fix: Run `touch simulate --save` to write a fresh record; defaults are used until then."
            ),
            TouchError::ForeignData { .. } | TouchError::KeyMissing { .. } => format!(
                "What happened: {te}.\nLikely causes: Another component owns this region of the store.\nHow to fix: Point store.offset at a free region or erase the image."
            ),
            TouchError::FormatVersion(_) | TouchError::SensorCount { .. } => format!(
                "What happened: {te}.\nLikely causes: The record was written by a different firmware or sensor layout.\nHow to fix: Save again with the current configuration."
            ),
            TouchError::NoSpace { .. } | TouchError::CountOutOfRange(_) => format!(
                "What happened: {te}.\nLikely causes: store.capacity too small for the sensor count.\nHow to fix: Raise store.capacity or lower store.offset."
            ),
            TouchError::NoStore => "What happened: No settings store is configured.\nLikely causes: store.image is not set.\nHow to fix: Set store.image in the config or pass --image.".to_string(),
            TouchError::ScheduleFull { .. } | TouchError::ScanOrder(_) => format!(
                "What happened: {te}.\nLikely causes: Inconsistent scan order.\nHow to fix: Check array.measurements_per_sensor and the sensor count."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: {he}.\nLikely causes: Wrong store.image path, missing permissions, or an image of another size.\nHow to fix: Check store.image and store.capacity in the config."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid touch configuration") || lower.contains("parse config") {
        let detail = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid{detail}.\nLikely causes: Missing [[sensors]], out-of-range values, or a typo in a field name.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("touch script csv must have headers") {
        return "Invalid headers in touch script CSV. Expected 'at_ms,sensor,level'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn is_config_error(err: &eyre::Report) -> bool {
    if err.downcast_ref::<BuildError>().is_some() {
        return true;
    }
    let lower = err.to_string().to_ascii_lowercase();
    lower.contains("invalid touch configuration") || lower.contains("parse config")
}

/// Exit codes: 3 for settings-store failures, 4 for configuration errors, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(te) = err.downcast_ref::<TouchError>() {
        return if te.is_persistence() { 3 } else { 4 };
    }
    if err.downcast_ref::<HwError>().is_some() {
        return 3;
    }
    if is_config_error(err) {
        return 4;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(te) = err.downcast_ref::<TouchError>() {
        return json!({
            "reason": touch_error_name(te),
            "code": te.code(),
            "message": humanize(err),
        })
        .to_string();
    }
    if is_config_error(err) {
        return json!({ "reason": "Config", "message": humanize(err) }).to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
