//! Irrigation controller.
//!
//! Two sub-decisions, evaluated in this order every tick:
//!
//! 1. **Auto-off by duration** while the pump is observed on.  If nobody
//!    recorded when the pump started (turned on by hand, or the process
//!    restarted) the timer is backfilled to `now`: the run is assumed to
//!    have just begun rather than to be overdue.
//! 2. **Auto-on by moisture**, only while the pump is observed off.
//!
//! Because step 2 requires the pump to be off, a tick produces at most one
//! command.

use chrono::Duration;
use log::debug;

use crate::config::GrowBoxConfig;
use crate::phase::Timestamp;

use super::SwitchCommand;

/// When the current pump run began.  Runtime only, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PumpTimer {
    started_at: Option<Timestamp>,
}

impl PumpTimer {
    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn start(&mut self, now: &Timestamp) {
        self.started_at = Some(*now);
    }

    pub fn clear(&mut self) {
        self.started_at = None;
    }

    /// Time the pump has been running, if a run is being timed.
    pub fn elapsed(&self, now: &Timestamp) -> Option<Duration> {
        self.started_at.map(|start| now.signed_duration_since(start))
    }
}

pub struct IrrigationController {
    max_duration: Duration,
    target_moisture: f32,
}

impl IrrigationController {
    pub fn new(max_duration_secs: u32, target_moisture: f32) -> Self {
        Self {
            max_duration: Duration::seconds(i64::from(max_duration_secs)),
            target_moisture,
        }
    }

    pub fn from_config(config: &GrowBoxConfig) -> Self {
        Self::new(config.pump_max_duration_secs, config.target_moisture)
    }

    /// Evaluate one tick against the observed pump state.
    ///
    /// `read_moisture` is only called when the pump is off; it returns
    /// `None` when no sensor is configured or the reading is unusable.
    pub fn update(
        &self,
        now: &Timestamp,
        pump_is_on: bool,
        timer: &mut PumpTimer,
        read_moisture: impl FnOnce() -> Option<f32>,
    ) -> Option<SwitchCommand> {
        if pump_is_on {
            if timer.started_at().is_none() {
                debug!("Pump on with no recorded start, timing from now");
                timer.start(now);
            }
            let elapsed = timer.elapsed(now).unwrap_or_else(Duration::zero);
            if elapsed > self.max_duration {
                timer.clear();
                return Some(SwitchCommand::TurnOff);
            }
            return None;
        }

        timer.clear();

        let moisture = read_moisture().filter(|v| v.is_finite())?;
        if moisture < self.target_moisture {
            timer.start(now);
            return Some(SwitchCommand::TurnOn);
        }
        None
    }
}
