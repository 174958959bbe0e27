//! Sub-controllers: one per physical system.
//!
//! Each controller is a pure decision over a snapshot of readings and
//! observed actuator state.  None of them touch the [`Environment`]
//! directly; the [`ControlLoop`] reads the inputs, calls the decision and
//! dispatches whatever [`SwitchCommand`] comes back.
//!
//! [`Environment`]: crate::app::ports::Environment
//! [`ControlLoop`]: crate::app::service::ControlLoop

pub mod climate;
pub mod irrigation;
pub mod light;

use core::fmt;

/// On/off command for a switch-like actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchCommand {
    TurnOn,
    TurnOff,
}

impl SwitchCommand {
    /// The switch state this command produces.
    pub fn target_state(self) -> bool {
        matches!(self, Self::TurnOn)
    }

    /// Command that moves `observed` to `desired`, or `None` if they
    /// already agree.  Never re-issues a command matching current state.
    pub fn toward(desired: bool, observed: bool) -> Option<Self> {
        match (desired, observed) {
            (true, false) => Some(Self::TurnOn),
            (false, true) => Some(Self::TurnOff),
            _ => None,
        }
    }
}

impl fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => write!(f, "turn_on"),
            Self::TurnOff => write!(f, "turn_off"),
        }
    }
}
