//! Inbound commands to the control loop.
//!
//! These represent actions requested by the outside world (phase selector,
//! master switch, config reload) that the
//! [`ControlLoop`](super::service::ControlLoop) interprets and acts upon.

use crate::config::GrowBoxConfig;
use crate::phase::Timestamp;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Select a growth phase.  Without an explicit start the phase clock
    /// restarts only if the phase actually changes.
    SetPhase {
        phase: String,
        start: Option<Timestamp>,
    },

    /// Flip the master switch.  Enabling runs an immediate tick.
    SetMasterEnabled(bool),

    /// Replace the configuration wholesale (validated first).
    UpdateConfig(GrowBoxConfig),

    /// Persist the phase state on the next save check.
    SaveState,
}
