//! Unified error types for the grow box control core.
//!
//! A single `Error` enum that every sub-controller converts into, keeping
//! the control loop's error handling uniform.  Only [`Error::Controller`]
//! is a genuine fault; the first two variants describe a decision that was
//! skipped because an input was missing.

use core::fmt;

// ---------------------------------------------------------------------------
// Sub-controller identity
// ---------------------------------------------------------------------------

/// The three independent physical systems driven by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerId {
    Light,
    Climate,
    Irrigation,
}

impl ControllerId {
    /// Evaluation order within one tick.
    pub const ALL: [ControllerId; 3] = [Self::Light, Self::Climate, Self::Irrigation];
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Climate => write!(f, "climate"),
            Self::Irrigation => write!(f, "irrigation"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required entity identifier is not configured.
    ConfigurationIncomplete(&'static str),
    /// An entity state is absent, "unavailable", "unknown" or non-numeric.
    UnavailableReading(String),
    /// Unexpected fault while evaluating one sub-controller.
    Controller {
        controller: ControllerId,
        reason: String,
    },
    /// Configuration failed range validation.
    Config(&'static str),
}

impl Error {
    pub fn controller(controller: ControllerId, reason: impl Into<String>) -> Self {
        Self::Controller {
            controller,
            reason: reason.into(),
        }
    }

    /// Skips are expected during normal operation and never count as faults.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationIncomplete(_) | Self::UnavailableReading(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationIncomplete(field) => write!(f, "configuration incomplete: {field}"),
            Self::UnavailableReading(entity) => write!(f, "reading unavailable: {entity}"),
            Self::Controller { controller, reason } => write!(f, "{controller} controller: {reason}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
