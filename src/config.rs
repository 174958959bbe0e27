//! Grow box configuration parameters
//!
//! Everything the control loop reads but never writes: entity identifiers,
//! the light schedule, climate thresholds and irrigation limits.  Loaded at
//! startup through a [`ConfigPort`](crate::app::ports::ConfigPort) and
//! replaced wholesale on reload.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::phase::StandardPhase;

/// Number of operator-authored phase slots.
pub const MAX_CUSTOM_PHASES: usize = 3;

/// An operator-defined phase: a free-form name with its own light hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPhase {
    pub name: String,
    pub light_hours: f32,
}

impl CustomPhase {
    pub fn new(name: impl Into<String>, light_hours: f32) -> Self {
        Self {
            name: name.into(),
            light_hours,
        }
    }
}

/// Per-standard-phase light hour overrides.
///
/// `None` means "not configured"; lookup then falls through to the custom
/// phases and finally to the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseLightHours {
    pub seedling: Option<f32>,
    pub vegetative: Option<f32>,
    pub flowering: Option<f32>,
    pub drying: Option<f32>,
    pub curing: Option<f32>,
}

impl PhaseLightHours {
    /// No overrides at all: every standard phase uses the built-in table.
    pub fn unset() -> Self {
        Self {
            seedling: None,
            vegetative: None,
            flowering: None,
            drying: None,
            curing: None,
        }
    }

    pub fn get(&self, phase: StandardPhase) -> Option<f32> {
        match phase {
            StandardPhase::Seedling => self.seedling,
            StandardPhase::Vegetative => self.vegetative,
            StandardPhase::Flowering => self.flowering,
            StandardPhase::Drying => self.drying,
            StandardPhase::Curing => self.curing,
        }
    }

    pub fn set(&mut self, phase: StandardPhase, hours: Option<f32>) {
        let slot = match phase {
            StandardPhase::Seedling => &mut self.seedling,
            StandardPhase::Vegetative => &mut self.vegetative,
            StandardPhase::Flowering => &mut self.flowering,
            StandardPhase::Drying => &mut self.drying,
            StandardPhase::Curing => &mut self.curing,
        };
        *slot = hours;
    }
}

impl Default for PhaseLightHours {
    fn default() -> Self {
        let mut hours = Self::unset();
        for phase in StandardPhase::ALL {
            hours.set(phase, Some(phase.default_light_hours()));
        }
        hours
    }
}

/// Core grow box configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowBoxConfig {
    // --- Entities ---
    /// Light actuator (switch or light).
    pub light_entity: String,
    /// Ventilation fan actuator.
    pub fan_entity: String,
    /// Irrigation pump actuator.
    pub pump_entity: Option<String>,
    /// Air temperature sensor (°C).
    pub temp_sensor: String,
    /// Relative humidity sensor (%).
    pub humidity_sensor: String,
    /// Soil moisture sensor (%).
    pub moisture_sensor: Option<String>,

    // --- Light schedule ---
    /// Hour of day (0-23) at which the daily light window opens.
    pub light_start_hour: u8,
    pub phase_light_hours: PhaseLightHours,
    pub custom_phases: Vec<CustomPhase, MAX_CUSTOM_PHASES>,

    // --- Climate ---
    /// Fan turns on above this temperature (°C).
    pub target_temperature: f32,
    /// Fan turns on above this relative humidity (%).
    pub max_humidity: f32,

    // --- Irrigation ---
    /// Longest single pump run (seconds).
    pub pump_max_duration_secs: u32,
    /// Pump turns on below this soil moisture (%).
    pub target_moisture: f32,

    // --- Timing ---
    /// Scheduled tick cadence (seconds).
    pub tick_interval_secs: u32,
}

impl Default for GrowBoxConfig {
    fn default() -> Self {
        Self {
            light_entity: String::new(),
            fan_entity: String::new(),
            pump_entity: None,
            temp_sensor: String::new(),
            humidity_sensor: String::new(),
            moisture_sensor: None,

            light_start_hour: 6,
            phase_light_hours: PhaseLightHours::default(),
            custom_phases: Vec::new(),

            target_temperature: 24.0,
            max_humidity: 60.0,

            pump_max_duration_secs: 60,
            target_moisture: 30.0,

            tick_interval_secs: 60, // 1/min
        }
    }
}

/// Treat blank identifiers the same as absent ones.
fn non_blank(id: &str) -> Option<&str> {
    let id = id.trim();
    (!id.is_empty()).then_some(id)
}

impl GrowBoxConfig {
    pub fn light_entity(&self) -> Option<&str> {
        non_blank(&self.light_entity)
    }

    pub fn fan_entity(&self) -> Option<&str> {
        non_blank(&self.fan_entity)
    }

    pub fn pump_entity(&self) -> Option<&str> {
        self.pump_entity.as_deref().and_then(non_blank)
    }

    pub fn temp_sensor(&self) -> Option<&str> {
        non_blank(&self.temp_sensor)
    }

    pub fn humidity_sensor(&self) -> Option<&str> {
        non_blank(&self.humidity_sensor)
    }

    pub fn moisture_sensor(&self) -> Option<&str> {
        self.moisture_sensor.as_deref().and_then(non_blank)
    }

    /// Names of required entity fields that are not configured.
    ///
    /// Missing entities never fail validation; the affected sub-controller
    /// simply skips its decision each tick.
    pub fn missing_entities(&self) -> std::vec::Vec<&'static str> {
        let mut missing = std::vec::Vec::new();
        if self.light_entity().is_none() {
            missing.push("light_entity");
        }
        if self.fan_entity().is_none() {
            missing.push("fan_entity");
        }
        if self.temp_sensor().is_none() {
            missing.push("temp_sensor");
        }
        if self.humidity_sensor().is_none() {
            missing.push("humidity_sensor");
        }
        missing
    }

    /// Range-check every numeric field.  Run before persisting or applying
    /// a reload; invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        if self.light_start_hour > 23 {
            return Err(Error::Config("light_start_hour must be 0–23"));
        }
        for phase in StandardPhase::ALL {
            if let Some(hours) = self.phase_light_hours.get(phase) {
                if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
                    return Err(Error::Config("phase light hours must be 0–24"));
                }
            }
        }
        for (i, custom) in self.custom_phases.iter().enumerate() {
            if custom.name.trim().is_empty() {
                return Err(Error::Config("custom phase name must not be empty"));
            }
            if !custom.light_hours.is_finite() || !(0.0..=24.0).contains(&custom.light_hours) {
                return Err(Error::Config("custom phase light hours must be 0–24"));
            }
            if self.custom_phases[..i].iter().any(|c| c.name == custom.name) {
                return Err(Error::Config("custom phase names must be unique"));
            }
        }
        if !self.target_temperature.is_finite() || !(-10.0..=50.0).contains(&self.target_temperature) {
            return Err(Error::Config("target_temperature must be -10–50 °C"));
        }
        if !self.max_humidity.is_finite() || !(0.0..=100.0).contains(&self.max_humidity) {
            return Err(Error::Config("max_humidity must be 0–100 %"));
        }
        if !(1..=3600).contains(&self.pump_max_duration_secs) {
            return Err(Error::Config("pump_max_duration_secs must be 1–3600"));
        }
        if !self.target_moisture.is_finite() || !(0.0..=100.0).contains(&self.target_moisture) {
            return Err(Error::Config("target_moisture must be 0–100 %"));
        }
        if !(1..=3600).contains(&self.tick_interval_secs) {
            return Err(Error::Config("tick_interval_secs must be 1–3600"));
        }
        Ok(())
    }
}

/// Phase and master-switch state as persisted by the host between restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedPhase {
    pub phase: String,
    /// ISO-8601 start timestamp; absent or malformed means "now" at load.
    pub phase_start: Option<String>,
    pub master_enabled: bool,
}

impl Default for PersistedPhase {
    fn default() -> Self {
        Self {
            phase: StandardPhase::Vegetative.as_str().to_string(),
            phase_start: None,
            master_enabled: true,
        }
    }
}
