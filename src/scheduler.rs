//! Tick scheduler.
//!
//! Decides *when* the control loop runs; the loop itself decides *what*
//! happens.  Two trigger sources feed one output:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  ┌───────────────┐          ┌────────────────────┐    │
//! │  │ Fixed interval│          │ On-demand request  │    │
//! │  │ (default 60s) │          │ (phase / master /  │    │
//! │  └───────┬───────┘          │  config change)    │    │
//! │          │                  └─────────┬──────────┘    │
//! │          ▼                            ▼               │
//! │  ┌──────────────────────────────────────────────┐     │
//! │  │      poll(dt) → at most one TickReason       │     │
//! │  └──────────────────────┬───────────────────────┘     │
//! │                         ▼                             │
//! │                  ControlLoop.tick()                   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Requests that arrive while a tick is already due are coalesced: each
//! `poll` yields at most one tick, and an on-demand tick restarts the
//! interval so a scheduled tick does not follow straight after it.

use log::{debug, info};

/// Lower bound on the tick interval.
pub const MIN_INTERVAL_SECS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReason {
    /// The fixed interval elapsed.
    Scheduled,
    /// Someone asked for a tick now.
    OnDemand,
}

pub struct TickScheduler {
    interval_secs: f32,
    elapsed_secs: f32,
    pending: bool,
}

impl TickScheduler {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_secs: interval_secs.max(MIN_INTERVAL_SECS) as f32,
            elapsed_secs: 0.0,
            pending: false,
        }
    }

    /// Ask for a tick on the next poll.  Repeated requests collapse into one.
    pub fn request_immediate(&mut self) {
        if !self.pending {
            debug!("Scheduler: on-demand tick requested");
        }
        self.pending = true;
    }

    /// Change the cadence.  Time already elapsed counts toward the new
    /// interval.
    pub fn set_interval(&mut self, interval_secs: u32) {
        let interval = interval_secs.max(MIN_INTERVAL_SECS) as f32;
        if interval != self.interval_secs {
            info!("Scheduler: interval {}s -> {}s", self.interval_secs, interval);
            self.interval_secs = interval;
        }
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval_secs as u32
    }

    /// Advance by `dt_secs` and report whether a tick is due.
    pub fn poll(&mut self, dt_secs: f32) -> Option<TickReason> {
        self.elapsed_secs += dt_secs.max(0.0);

        if self.pending {
            self.pending = false;
            self.elapsed_secs = 0.0;
            return Some(TickReason::OnDemand);
        }
        if self.elapsed_secs >= self.interval_secs {
            // Missed intervals are not replayed.
            self.elapsed_secs = 0.0;
            return Some(TickReason::Scheduled);
        }
        None
    }

    /// Seconds until the next scheduled tick, ignoring pending requests.
    pub fn secs_until_due(&self) -> f32 {
        (self.interval_secs - self.elapsed_secs).max(0.0)
    }
}
