//! Light-phase scheduler.
//!
//! The light window opens every day at `start_hour:00` local time and stays
//! open for the phase's light hours, possibly running past midnight.  The
//! window that matters is always the one opened by the most recent
//! occurrence of the start hour at or before `now`:
//!
//! ```text
//!   start_hour = 6, hours = 18
//!
//!   00:00      06:00                              24:00
//!     │ (yday)  │◀──────────── ON ────────────────▶│
//!     │◀─ OFF ─▶│
//! ```

use chrono::{Duration, Timelike};

use crate::error::{ControllerId, Error, Result};
use crate::phase::Timestamp;

use super::SwitchCommand;

/// Whether the light should be on at `now`.
pub fn light_due_on(now: &Timestamp, phase_hours: f32, start_hour: u8) -> Result<bool> {
    if !phase_hours.is_finite() {
        return Err(Error::controller(
            ControllerId::Light,
            format!("light hours not finite: {phase_hours}"),
        ));
    }
    if phase_hours >= 24.0 {
        return Ok(true);
    }
    if phase_hours <= 0.0 {
        return Ok(false);
    }

    let opens_today = now
        .date_naive()
        .and_hms_opt(u32::from(start_hour), 0, 0)
        .and_then(|naive| naive.and_local_timezone(*now.offset()).single())
        .ok_or_else(|| {
            Error::controller(ControllerId::Light, format!("invalid start hour {start_hour}"))
        })?;

    // Before the start hour, the current window opened yesterday.
    let window_start = if now.hour() < u32::from(start_hour) {
        opens_today - Duration::days(1)
    } else {
        opens_today
    };

    let elapsed_secs = now.signed_duration_since(window_start).num_milliseconds() as f64 / 1000.0;
    let duration_secs = f64::from(phase_hours) * 3600.0;
    Ok((0.0..duration_secs).contains(&elapsed_secs))
}

/// Decide the light command for this tick.
///
/// Returns `Ok(None)` when the light already matches the schedule or its
/// observed state is unavailable (never guess).
pub fn decide(
    now: &Timestamp,
    phase_hours: f32,
    start_hour: u8,
    light_is_on: Option<bool>,
) -> Result<Option<SwitchCommand>> {
    let Some(is_on) = light_is_on else {
        return Ok(None);
    };
    let due_on = light_due_on(now, phase_hours, start_hour)?;
    Ok(SwitchCommand::toward(due_on, is_on))
}
