//! Fuzz target: configuration documents
//!
//! Parses arbitrary bytes as a JSON configuration and verifies:
//! - No panics from parsing, validation or phase resolution
//! - Every config that passes validation yields finite light hours
//!   within 0–24 for every selectable phase
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use growbox::config::GrowBoxConfig;
use growbox::phase::{available_phases, resolve_light_hours};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<GrowBoxConfig>(data) else {
        return;
    };
    let _ = config.missing_entities();
    if config.validate().is_err() {
        return;
    }

    for phase in available_phases(&config) {
        let hours = resolve_light_hours(&phase, &config);
        assert!(hours.is_finite() && (0.0..=24.0).contains(&hours), "{phase}: {hours}");
    }
});
