//! Simulated host environment.
//!
//! Implements [`Environment`] over an in-memory table of raw entity
//! states, the way a home-automation host exposes them: plain strings such
//! as `"on"`, `"23.4"` or `"unavailable"`.  Commands flip the target
//! switch immediately and are recorded for inspection.
//!
//! Used by the binary when no real host is attached, and by tests.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::app::ports::{ActuatorError, Environment, collapse_numeric_state, collapse_switch_state};
use crate::config::GrowBoxConfig;
use crate::control::SwitchCommand;

#[derive(Debug, Default)]
pub struct SimulatedEnvironment {
    states: HashMap<String, String>,
    rejecting: HashSet<String>,
    issued: Vec<(String, SwitchCommand)>,
}

impl SimulatedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every configured actuator as `"off"`.  Sensors start absent.
    pub fn from_config(config: &GrowBoxConfig) -> Self {
        let mut env = Self::new();
        for id in [config.light_entity(), config.fan_entity(), config.pump_entity()]
            .into_iter()
            .flatten()
        {
            env.set_state(id, "off");
        }
        env
    }

    pub fn set_state(&mut self, entity_id: &str, raw: impl Into<String>) {
        self.states.insert(entity_id.to_string(), raw.into());
    }

    pub fn raw_state(&self, entity_id: &str) -> Option<&str> {
        self.states.get(entity_id).map(String::as_str)
    }

    /// Make the host refuse every command for `entity_id`.
    pub fn reject_commands_for(&mut self, entity_id: &str) {
        self.rejecting.insert(entity_id.to_string());
    }

    /// Commands accepted so far, oldest first.
    pub fn issued(&self) -> &[(String, SwitchCommand)] {
        &self.issued
    }
}

impl Environment for SimulatedEnvironment {
    fn read_numeric_state(&self, entity_id: &str) -> Option<f32> {
        collapse_numeric_state(self.raw_state(entity_id))
    }

    fn read_switch_state(&self, entity_id: &str) -> Option<bool> {
        collapse_switch_state(self.raw_state(entity_id))
    }

    fn issue_command(&mut self, entity_id: &str, command: SwitchCommand) -> Result<(), ActuatorError> {
        if self.rejecting.contains(entity_id) {
            return Err(ActuatorError::Rejected(format!("{entity_id} refused {command}")));
        }
        let Some(state) = self.states.get_mut(entity_id) else {
            return Err(ActuatorError::UnknownEntity(entity_id.to_string()));
        };
        *state = if command.target_state() { "on" } else { "off" }.to_string();
        debug!("SimEnv: {} -> {}", entity_id, state);
        self.issued.push((entity_id.to_string(), command));
        Ok(())
    }
}
