//! Fuzz target: persisted phase state
//!
//! Feeds arbitrary bytes to the phase restore path, both as a postcard
//! blob and as a raw start-timestamp string, and verifies:
//! - No panics on corrupted or hostile input
//! - A restored phase clock never starts in the future
//! - Re-persisting and restoring yields the same clock
//!
//! cargo fuzz run fuzz_persisted_phase

#![no_main]

use chrono::{FixedOffset, TimeZone};
use growbox::config::PersistedPhase;
use growbox::phase::PhaseClock;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(now) = FixedOffset::east_opt(3600).and_then(|tz| tz.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single()) else {
        return;
    };

    let mut candidates = Vec::new();
    if let Ok(persisted) = postcard::from_bytes::<PersistedPhase>(data) {
        candidates.push(persisted);
    }
    if let Ok(raw) = core::str::from_utf8(data) {
        candidates.push(PersistedPhase {
            phase: "vegetative".into(),
            phase_start: Some(raw.to_string()),
            master_enabled: true,
        });
    }

    for persisted in candidates {
        let clock = PhaseClock::from_persisted(&persisted, &now);
        assert!(clock.phase_start() <= now, "phase start in the future");
        let _ = clock.days_in_phase(&now);

        let again = PhaseClock::from_persisted(&clock.to_persisted(persisted.master_enabled), &now);
        assert_eq!(again.phase_start(), clock.phase_start());
        assert_eq!(again.current_phase(), clock.current_phase());
    }
});
