//! Climate controller: VPD calculation and fan hysteresis.
//!
//! ## VPD
//!
//! `SVP = 0.61078 · exp(17.27·T / (T + 237.3))` kPa (Tetens), and
//! `VPD = SVP · (1 − RH/100)`.  Leaf temperature is taken to equal air
//! temperature, so this is the air VPD, not the leaf VPD.
//!
//! ## Fan hysteresis
//!
//! ```text
//!   ON   T > target            OR  RH > max
//!   OFF  T < target − 1.0 °C   AND RH < max − 5 %
//!   otherwise hold the observed state
//! ```
//!
//! The OFF region lies strictly below the ON region, so the two can never
//! both hold; ON is evaluated first regardless.

use crate::config::GrowBoxConfig;

use super::SwitchCommand;

/// Degrees below target before the fan may turn off.
pub const OFF_TEMPERATURE_MARGIN: f32 = 1.0;
/// Humidity points below the maximum before the fan may turn off.
pub const OFF_HUMIDITY_MARGIN: f32 = 5.0;

/// Saturation vapour pressure of air at `temp_c`, in kPa.
pub fn saturation_vapor_pressure(temp_c: f32) -> f32 {
    0.61078 * ((17.27 * temp_c) / (temp_c + 237.3)).exp()
}

/// Vapour pressure deficit in kPa.
pub fn vapor_pressure_deficit(temp_c: f32, humidity_pct: f32) -> f32 {
    saturation_vapor_pressure(temp_c) * (1.0 - humidity_pct / 100.0)
}

/// What the fan should be doing given the current climate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanDemand {
    On,
    Off,
    /// Inside the dead-band: keep whatever the fan is doing.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateThresholds {
    pub target_temperature: f32,
    pub max_humidity: f32,
}

impl ClimateThresholds {
    pub fn from_config(config: &GrowBoxConfig) -> Self {
        Self {
            target_temperature: config.target_temperature,
            max_humidity: config.max_humidity,
        }
    }

    pub fn demand(&self, temp_c: f32, humidity_pct: f32) -> FanDemand {
        if temp_c > self.target_temperature || humidity_pct > self.max_humidity {
            FanDemand::On
        } else if temp_c < self.target_temperature - OFF_TEMPERATURE_MARGIN
            && humidity_pct < self.max_humidity - OFF_HUMIDITY_MARGIN
        {
            FanDemand::Off
        } else {
            FanDemand::Hold
        }
    }
}

/// Result of one climate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateUpdate {
    /// Fresh VPD, present whenever both readings are numeric.
    pub vpd: Option<f32>,
    pub command: Option<SwitchCommand>,
}

pub struct ClimateController {
    thresholds: ClimateThresholds,
}

impl ClimateController {
    pub fn new(thresholds: ClimateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn from_config(config: &GrowBoxConfig) -> Self {
        Self::new(ClimateThresholds::from_config(config))
    }

    /// Evaluate one tick.
    ///
    /// A missing or non-finite reading yields no VPD and no fan decision;
    /// an unknown fan state still yields VPD but no command.
    pub fn update(
        &self,
        temperature: Option<f32>,
        humidity: Option<f32>,
        fan_is_on: Option<bool>,
    ) -> ClimateUpdate {
        let (Some(temp_c), Some(humidity_pct)) = (
            temperature.filter(|v| v.is_finite()),
            humidity.filter(|v| v.is_finite()),
        ) else {
            return ClimateUpdate {
                vpd: None,
                command: None,
            };
        };

        let vpd = vapor_pressure_deficit(temp_c, humidity_pct);
        let command = fan_is_on.and_then(|is_on| match self.thresholds.demand(temp_c, humidity_pct) {
            FanDemand::On => SwitchCommand::toward(true, is_on),
            FanDemand::Off => SwitchCommand::toward(false, is_on),
            FanDemand::Hold => None,
        });

        ClimateUpdate {
            vpd: Some(vpd),
            command,
        }
    }
}
