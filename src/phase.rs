//! Growth phase tracking.
//!
//! [`PhaseClock`] records which phase is active and when it began, and
//! resolves the phase name to a light duration.  Names are resolved once
//! per decision into the tagged [`Phase`] variant:
//!
//! 1. a standard phase with a configured override,
//! 2. a custom phase whose name matches (slots 1, 2, 3 in order),
//! 3. a standard phase without override (built-in table),
//! 4. anything else: [`UNKNOWN_PHASE_LIGHT_HOURS`].
//!
//! A custom phase may therefore shadow a standard name only when that
//! standard phase has no configured hours.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime};
use log::{info, warn};

use crate::config::{GrowBoxConfig, PersistedPhase};

/// Every timestamp in the core carries an explicit UTC offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Light hours for a phase name nothing recognises.
pub const UNKNOWN_PHASE_LIGHT_HOURS: f32 = 12.0;

const SECS_PER_DAY: i64 = 86_400;

// ═══════════════════════════════════════════════════════════════
//  Phase identity
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardPhase {
    Seedling,
    Vegetative,
    Flowering,
    Drying,
    Curing,
}

impl StandardPhase {
    pub const ALL: [StandardPhase; 5] = [
        Self::Seedling,
        Self::Vegetative,
        Self::Flowering,
        Self::Drying,
        Self::Curing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seedling => "seedling",
            Self::Vegetative => "vegetative",
            Self::Flowering => "flowering",
            Self::Drying => "drying",
            Self::Curing => "curing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Built-in light hours, used when the phase has no configured override.
    pub fn default_light_hours(self) -> f32 {
        match self {
            Self::Seedling | Self::Vegetative => 18.0,
            Self::Flowering => 12.0,
            Self::Drying | Self::Curing => 0.0,
        }
    }
}

/// A phase name resolved against the current configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Standard(StandardPhase),
    /// Custom phase slot, 1-based (1..=3).
    Custom(usize),
    Unknown(String),
}

impl Phase {
    pub fn resolve(name: &str, config: &GrowBoxConfig) -> Self {
        let standard = StandardPhase::from_name(name);
        if let Some(phase) = standard {
            if config.phase_light_hours.get(phase).is_some() {
                return Self::Standard(phase);
            }
        }
        if let Some(i) = config.custom_phases.iter().position(|c| c.name == name) {
            return Self::Custom(i + 1);
        }
        match standard {
            Some(phase) => Self::Standard(phase),
            None => Self::Unknown(name.to_string()),
        }
    }

    pub fn light_hours(&self, config: &GrowBoxConfig) -> f32 {
        match self {
            Self::Standard(phase) => config
                .phase_light_hours
                .get(*phase)
                .unwrap_or_else(|| phase.default_light_hours()),
            Self::Custom(slot) => config
                .custom_phases
                .get(slot.saturating_sub(1))
                .map_or(UNKNOWN_PHASE_LIGHT_HOURS, |c| c.light_hours),
            Self::Unknown(_) => UNKNOWN_PHASE_LIGHT_HOURS,
        }
    }
}

/// Light hours for a phase name.
pub fn resolve_light_hours(phase: &str, config: &GrowBoxConfig) -> f32 {
    Phase::resolve(phase, config).light_hours(config)
}

/// Phase names an operator can select: the standard phases, then the
/// configured custom phases in slot order.
pub fn available_phases(config: &GrowBoxConfig) -> Vec<String> {
    StandardPhase::ALL
        .iter()
        .map(|p| p.as_str().to_string())
        .chain(
            config
                .custom_phases
                .iter()
                .map(|c| c.name.clone())
                .filter(|name| StandardPhase::from_name(name).is_none()),
        )
        .collect()
}

// ═══════════════════════════════════════════════════════════════
//  Timestamp parsing
// ═══════════════════════════════════════════════════════════════

const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a persisted ISO-8601 timestamp and express it in `reference`'s
/// offset.  Timestamps without an offset are taken to be in that offset
/// too, so naive and aware values are never compared.
///
/// Years outside 1–9999 are rejected; RFC 3339 cannot write them back.
pub fn parse_timestamp(raw: &str, reference: &Timestamp) -> Option<Timestamp> {
    parse_any_timestamp(raw.trim(), reference).filter(|ts| (1..=9999).contains(&ts.year()))
}

fn parse_any_timestamp(raw: &str, reference: &Timestamp) -> Option<Timestamp> {
    let offset = *reference.offset();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&offset));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&offset));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.and_local_timezone(offset).single();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| naive.and_local_timezone(offset).single())
}

// ═══════════════════════════════════════════════════════════════
//  Phase clock
// ═══════════════════════════════════════════════════════════════

/// Active phase and the moment it began.
///
/// Invariant: `phase_start <= now` for every `now` the clock has been
/// given.  Starts in the future are clamped on the way in.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseClock {
    current_phase: String,
    phase_start: Timestamp,
}

impl PhaseClock {
    pub fn new(phase: impl Into<String>, start: Option<Timestamp>, now: &Timestamp) -> Self {
        Self {
            current_phase: phase.into(),
            phase_start: clamp_start(start.unwrap_or(*now), now),
        }
    }

    /// Rebuild from persisted state, substituting `now` for an absent or
    /// malformed start timestamp.
    pub fn from_persisted(persisted: &PersistedPhase, now: &Timestamp) -> Self {
        let start = match persisted.phase_start.as_deref() {
            Some(raw) => {
                let parsed = parse_timestamp(raw, now);
                if parsed.is_none() {
                    warn!("Phase start '{}' is malformed, using now", raw);
                }
                parsed
            }
            None => None,
        };
        Self::new(persisted.phase.clone(), start, now)
    }

    pub fn current_phase(&self) -> &str {
        &self.current_phase
    }

    pub fn phase_start(&self) -> Timestamp {
        self.phase_start
    }

    pub fn light_hours(&self, config: &GrowBoxConfig) -> f32 {
        resolve_light_hours(&self.current_phase, config)
    }

    /// Whole days since the phase began, floored at zero under clock skew.
    pub fn days_in_phase(&self, now: &Timestamp) -> u32 {
        let elapsed = now.signed_duration_since(self.phase_start).num_seconds();
        (elapsed.max(0) / SECS_PER_DAY) as u32
    }

    /// Switch phase.  An explicit start always wins; otherwise the clock
    /// restarts only when the phase actually changes.
    ///
    /// Returns `true` if the phase name changed.
    pub fn set_phase(
        &mut self,
        new_phase: impl Into<String>,
        explicit_start: Option<Timestamp>,
        now: &Timestamp,
    ) -> bool {
        let new_phase = new_phase.into();
        let changed = new_phase != self.current_phase;

        if let Some(start) = explicit_start {
            self.phase_start = clamp_start(start, now);
        } else if changed {
            self.phase_start = *now;
        }

        if changed {
            info!("Phase: {} -> {}", self.current_phase, new_phase);
            self.current_phase = new_phase;
        }
        changed
    }

    pub fn to_persisted(&self, master_enabled: bool) -> PersistedPhase {
        PersistedPhase {
            phase: self.current_phase.clone(),
            phase_start: Some(self.phase_start.to_rfc3339()),
            master_enabled,
        }
    }
}

fn clamp_start(start: Timestamp, now: &Timestamp) -> Timestamp {
    let start = start.with_timezone(now.offset());
    if start > *now {
        warn!("Phase start {} is in the future, clamping to now", start);
        *now
    } else {
        start
    }
}
