#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate arbitrary TOML; errors are fine, panics are not.
    if let Ok(cfg) = toml::from_str::<touch_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A validated config must convert cleanly.
            let _ = touch_core::conversions::sensor_configs(&cfg);
        }
    }
});
