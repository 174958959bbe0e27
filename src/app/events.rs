//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them.

use crate::control::SwitchCommand;
use crate::error::ControllerId;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The loop has started.
    Started { phase: String, master_enabled: bool },

    /// A sub-controller dispatched an actuator command.
    CommandIssued {
        controller: ControllerId,
        entity: String,
        command: SwitchCommand,
    },

    /// A sub-controller faulted; the rest of the tick still ran.
    ControllerFailed {
        controller: ControllerId,
        reason: String,
    },

    /// The master switch changed.
    MasterToggled(bool),

    /// The growth phase changed.
    PhaseChanged { from: String, to: String },

    /// A new configuration was applied.
    ConfigReloaded,

    /// Snapshot emitted after every enabled tick.
    Telemetry(Telemetry),
}

/// A point-in-time snapshot for logging or presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub master_enabled: bool,
    pub phase: String,
    pub days_in_phase: u32,
    pub light_hours: f32,
    /// Last computed VPD, rounded to two decimals.
    pub vpd_kpa: Option<f32>,
    /// Seconds the current pump run has lasted, if one is being timed.
    pub pump_running_secs: Option<i64>,
    pub tick_count: u64,
}
