//! Port traits: the hexagonal boundary between domain logic and the host.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! The host platform that owns the entities implements [`Environment`];
//! persistence implements [`ConfigPort`]; wall-clock time comes from a
//! [`Clock`].  The [`ControlLoop`](super::service::ControlLoop) consumes
//! them via generics, so the core never performs I/O directly.

use core::fmt;

use crate::config::{GrowBoxConfig, PersistedPhase};
use crate::control::SwitchCommand;
use crate::error::Error;
use crate::phase::Timestamp;

// ───────────────────────────────────────────────────────────────
// Environment (host entities: sensors in, actuator commands out)
// ───────────────────────────────────────────────────────────────

/// Last-known entity state plus fire-and-forget commands.
///
/// Reads must be fast and non-blocking.  The core never waits for a
/// command to take effect; it re-evaluates against observed state on the
/// next tick.
pub trait Environment {
    /// Numeric state of a sensor.  `None` for missing, "unavailable",
    /// "unknown" and non-numeric states alike.
    fn read_numeric_state(&self, entity_id: &str) -> Option<f32>;

    /// On/off state of a switch-like entity.  `None` if the entity is
    /// absent or its state is not a definite on/off.
    fn read_switch_state(&self, entity_id: &str) -> Option<bool>;

    /// Dispatch a command.  An `Err` means the host refused it outright.
    fn issue_command(&mut self, entity_id: &str, command: SwitchCommand) -> Result<(), ActuatorError>;
}

/// States a host reports when it has no usable value.
pub const UNAVAILABLE_STATES: [&str; 3] = ["unavailable", "unknown", "none"];

/// Collapse a raw host state into a number.  Every sentinel, parse failure
/// and non-finite value becomes `None`.
pub fn collapse_numeric_state(raw: Option<&str>) -> Option<f32> {
    let raw = raw?.trim();
    if raw.is_empty() || UNAVAILABLE_STATES.iter().any(|s| raw.eq_ignore_ascii_case(s)) {
        return None;
    }
    raw.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Collapse a raw host state into on/off.
pub fn collapse_switch_state(raw: Option<&str>) -> Option<bool> {
    match raw?.trim() {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persisted config and phase state)
// ───────────────────────────────────────────────────────────────

/// Loads and persists configuration and phase state.
///
/// Implementations MUST validate configuration before persisting and
/// return defaults when nothing has been stored yet.
pub trait ConfigPort {
    fn load_config(&self) -> Result<GrowBoxConfig, ConfigError>;

    fn save_config(&self, config: &GrowBoxConfig) -> Result<(), ConfigError>;

    fn load_phase(&self) -> Result<PersistedPhase, ConfigError>;

    fn save_phase(&self, phase: &PersistedPhase) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    /// Local wall-clock time with its UTC offset.
    fn now(&self) -> Timestamp;

    /// Monotonic seconds since the clock was created.
    fn uptime_secs(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`Environment::issue_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    /// The host has no entity with this id.
    UnknownEntity(String),
    /// The host rejected the command.
    Rejected(String),
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored data failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl From<Error> for ConfigError {
    fn from(e: Error) -> Self {
        match e {
            Error::Config(msg) | Error::ConfigurationIncomplete(msg) => Self::ValidationFailed(msg),
            _ => Self::ValidationFailed("invalid configuration"),
        }
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEntity(id) => write!(f, "unknown entity {}", id),
            Self::Rejected(reason) => write!(f, "command rejected: {}", reason),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ActuatorError {}
impl std::error::Error for ConfigError {}
