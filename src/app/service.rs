//! Control loop: the hexagonal core.
//!
//! [`ControlLoop`] owns the configuration, the phase clock and the runtime
//! state.  Each enabled tick runs the three sub-controllers in a fixed
//! order, each isolated from the others:
//!
//! ```text
//!                 ┌───────────────────────────────┐
//!  Environment ──▶│          ControlLoop          │──▶ EventSink
//!   (read)        │ light → climate → irrigation  │
//!  Environment ◀──│   (one Result per controller) │
//!   (command)     └───────────────────────────────┘
//! ```
//!
//! `tick` takes `&mut self`, so ticks are single-flight by construction:
//! a scheduled tick and an on-demand tick can never interleave.

use log::{debug, info, warn};

use crate::config::{GrowBoxConfig, PersistedPhase};
use crate::control::climate::ClimateController;
use crate::control::irrigation::{IrrigationController, PumpTimer};
use crate::control::{SwitchCommand, light};
use crate::error::{ControllerId, Error, Result};
use crate::phase::{PhaseClock, Timestamp, parse_timestamp};

use super::commands::AppCommand;
use super::events::{AppEvent, Telemetry};
use super::ports::{ConfigPort, Environment, EventSink};

/// Quiet period after a phase/master change before it is persisted.
const SAVE_SETTLE_SECS: i64 = 5;

// ───────────────────────────────────────────────────────────────
// Runtime state
// ───────────────────────────────────────────────────────────────

/// Transient state owned by the loop.  Never persisted: a restart forgets
/// in-flight pump timing.
#[derive(Debug, Clone, Default, PartialEq)]
struct RuntimeState {
    master_enabled: bool,
    pump_timer: PumpTimer,
    /// Most recent VPD (kPa); kept when a reading goes bad.
    last_vpd: Option<f32>,
}

// ───────────────────────────────────────────────────────────────
// Tick report
// ───────────────────────────────────────────────────────────────

/// How one sub-controller fared during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Commanded(SwitchCommand),
    /// Evaluated; nothing to change.
    Idle,
    /// Missing entity or unusable reading.
    Skipped(Error),
    Failed(Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Per-controller outcomes in evaluation order; empty when disabled.
    pub outcomes: Vec<(ControllerId, StepOutcome)>,
}

impl TickReport {
    /// `false` when the master switch suppressed the tick.
    pub fn ran(&self) -> bool {
        !self.outcomes.is_empty()
    }

    pub fn outcome(&self, controller: ControllerId) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == controller)
            .map(|(_, outcome)| outcome)
    }

    pub fn commands(&self) -> impl Iterator<Item = (ControllerId, SwitchCommand)> + '_ {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            StepOutcome::Commanded(cmd) => Some((*id, *cmd)),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (ControllerId, &Error)> + '_ {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            StepOutcome::Failed(e) => Some((*id, e)),
            _ => None,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop {
    config: GrowBoxConfig,
    phase: PhaseClock,
    runtime: RuntimeState,
    tick_count: u64,
    /// Set when phase or master state changed and has not been persisted.
    dirty_since: Option<Timestamp>,
}

impl ControlLoop {
    pub fn new(config: GrowBoxConfig, phase: PhaseClock, master_enabled: bool) -> Self {
        Self {
            config,
            phase,
            runtime: RuntimeState {
                master_enabled,
                ..RuntimeState::default()
            },
            tick_count: 0,
            dirty_since: None,
        }
    }

    /// Construct from persisted phase state, restoring the master switch.
    pub fn from_persisted(config: GrowBoxConfig, persisted: &PersistedPhase, now: &Timestamp) -> Self {
        let phase = PhaseClock::from_persisted(persisted, now);
        let restored = persisted
            .phase_start
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, now));
        let mut this = Self::new(config, phase, persisted.master_enabled);
        // A substituted start only survives a restart once it is saved.
        if restored != Some(this.phase.phase_start()) {
            this.mark_state_dirty(now);
        }
        this
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        for field in self.config.missing_entities() {
            warn!("Config: {} not set, its controller will stay idle", field);
        }
        sink.emit(&AppEvent::Started {
            phase: self.phase.current_phase().to_string(),
            master_enabled: self.runtime.master_enabled,
        });
        info!(
            "ControlLoop started: phase={} master={}",
            self.phase.current_phase(),
            if self.runtime.master_enabled { "on" } else { "off" }
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: light → climate → irrigation.
    ///
    /// With the master switch off this does nothing at all; runtime state
    /// stays frozen until re-enabled.
    pub fn tick(
        &mut self,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> TickReport {
        if !self.runtime.master_enabled {
            debug!("Tick skipped: master switch off");
            return TickReport::default();
        }
        self.tick_count += 1;

        let mut report = TickReport::default();
        for controller in ControllerId::ALL {
            let result = match controller {
                ControllerId::Light => self.run_light(now, env, sink),
                ControllerId::Climate => self.run_climate(env, sink),
                ControllerId::Irrigation => self.run_irrigation(now, env, sink),
            };
            let outcome = match result {
                Ok(Some(cmd)) => StepOutcome::Commanded(cmd),
                Ok(None) => StepOutcome::Idle,
                Err(e) if e.is_skip() => {
                    debug!("{} skipped: {}", controller, e);
                    StepOutcome::Skipped(e)
                }
                Err(e) => {
                    warn!("{} failed: {}", controller, e);
                    sink.emit(&AppEvent::ControllerFailed {
                        controller,
                        reason: e.to_string(),
                    });
                    StepOutcome::Failed(e)
                }
            };
            report.outcomes.push((controller, outcome));
        }

        sink.emit(&AppEvent::Telemetry(self.build_telemetry(now)));
        report
    }

    fn run_light(
        &mut self,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> Result<Option<SwitchCommand>> {
        let entity = self
            .config
            .light_entity()
            .ok_or(Error::ConfigurationIncomplete("light_entity"))?;
        let observed = env
            .read_switch_state(entity)
            .ok_or_else(|| Error::UnavailableReading(entity.to_string()))?;

        let hours = self.phase.light_hours(&self.config);
        let Some(cmd) = light::decide(now, hours, self.config.light_start_hour, Some(observed))? else {
            return Ok(None);
        };
        info!("Light {} (phase {}, {}h)", cmd, self.phase.current_phase(), hours);
        dispatch(ControllerId::Light, entity, cmd, env, sink)?;
        Ok(Some(cmd))
    }

    fn run_climate(
        &mut self,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> Result<Option<SwitchCommand>> {
        let temp_id = self
            .config
            .temp_sensor()
            .ok_or(Error::ConfigurationIncomplete("temp_sensor"))?;
        let humidity_id = self
            .config
            .humidity_sensor()
            .ok_or(Error::ConfigurationIncomplete("humidity_sensor"))?;

        let temperature = env.read_numeric_state(temp_id);
        let humidity = env.read_numeric_state(humidity_id);
        let fan_entity = self.config.fan_entity();
        let fan_is_on = fan_entity.and_then(|id| env.read_switch_state(id));

        let update = ClimateController::from_config(&self.config).update(temperature, humidity, fan_is_on);
        if let Some(vpd) = update.vpd {
            self.runtime.last_vpd = Some(vpd);
        }

        if temperature.is_none() {
            return Err(Error::UnavailableReading(temp_id.to_string()));
        }
        if humidity.is_none() {
            return Err(Error::UnavailableReading(humidity_id.to_string()));
        }
        let fan = fan_entity.ok_or(Error::ConfigurationIncomplete("fan_entity"))?;
        if fan_is_on.is_none() {
            return Err(Error::UnavailableReading(fan.to_string()));
        }

        let Some(cmd) = update.command else {
            return Ok(None);
        };
        info!(
            "Fan {} (T={:.1}°C RH={:.0}% VPD={:.2}kPa)",
            cmd,
            temperature.unwrap_or_default(),
            humidity.unwrap_or_default(),
            update.vpd.unwrap_or_default()
        );
        dispatch(ControllerId::Climate, fan, cmd, env, sink)?;
        Ok(Some(cmd))
    }

    fn run_irrigation(
        &mut self,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> Result<Option<SwitchCommand>> {
        let Some(pump) = self.config.pump_entity() else {
            return Ok(None);
        };
        let pump_is_on = env
            .read_switch_state(pump)
            .ok_or_else(|| Error::UnavailableReading(pump.to_string()))?;
        let moisture_id = self.config.moisture_sensor();

        let timer_before = self.runtime.pump_timer;
        let controller = IrrigationController::from_config(&self.config);
        let decision = {
            let env = &*env;
            controller.update(now, pump_is_on, &mut self.runtime.pump_timer, || {
                moisture_id.and_then(|id| env.read_numeric_state(id))
            })
        };

        let Some(cmd) = decision else {
            return Ok(None);
        };
        info!("Pump {}", cmd);
        if let Err(e) = dispatch(ControllerId::Irrigation, pump, cmd, env, sink) {
            // Retry the same decision next tick.
            self.runtime.pump_timer = timer_before;
            return Err(e);
        }
        Ok(Some(cmd))
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.  Returns the report of the on-demand
    /// tick, if the command triggered one.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> Option<TickReport> {
        match cmd {
            AppCommand::SetPhase { phase, start } => Some(self.set_phase(phase, start, now, env, sink)),
            AppCommand::SetMasterEnabled(enabled) => self.set_master_enabled(enabled, now, env, sink),
            AppCommand::UpdateConfig(config) => {
                if let Err(e) = self.update_config(config, sink) {
                    warn!("Config update rejected: {}", e);
                }
                None
            }
            AppCommand::SaveState => {
                self.dirty_since = Some(*now - chrono::Duration::seconds(SAVE_SETTLE_SECS));
                info!("Explicit state save requested");
                None
            }
        }
    }

    /// Select a phase, then run an on-demand tick so the light follows.
    pub fn set_phase(
        &mut self,
        phase: impl Into<String>,
        start: Option<Timestamp>,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> TickReport {
        let from = self.phase.current_phase().to_string();
        let explicit_start = start.is_some();
        if self.phase.set_phase(phase, start, now) {
            sink.emit(&AppEvent::PhaseChanged {
                from,
                to: self.phase.current_phase().to_string(),
            });
            self.mark_state_dirty(now);
        } else if explicit_start {
            self.mark_state_dirty(now);
        }
        self.tick(now, env, sink)
    }

    /// Flip the master switch.  Entering Enabled runs an immediate tick
    /// rather than waiting for the next scheduled one.
    pub fn set_master_enabled(
        &mut self,
        enabled: bool,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> Option<TickReport> {
        if enabled == self.runtime.master_enabled {
            return None;
        }
        self.runtime.master_enabled = enabled;
        info!("Master switch {}", if enabled { "on" } else { "off" });
        sink.emit(&AppEvent::MasterToggled(enabled));
        self.mark_state_dirty(now);
        enabled.then(|| self.tick(now, env, sink))
    }

    /// Apply an externally edited phase record.  A master switch-off takes
    /// effect before the phase change so the on-demand tick stays idle; a
    /// switch-on waits until the new phase is in place.
    pub fn apply_persisted_edit(
        &mut self,
        edited: &PersistedPhase,
        now: &Timestamp,
        env: &mut impl Environment,
        sink: &mut impl EventSink,
    ) -> Option<TickReport> {
        if !edited.master_enabled {
            self.set_master_enabled(false, now, env, sink);
        }

        let current = self.persisted_phase();
        let start_edited = edited.phase_start.is_some() && edited.phase_start != current.phase_start;
        let mut report = None;
        if edited.phase != current.phase || start_edited {
            // An untouched start must not pin a renamed phase to the old date.
            let start = edited
                .phase_start
                .as_deref()
                .filter(|_| start_edited)
                .and_then(|raw| parse_timestamp(raw, now));
            report = Some(self.set_phase(edited.phase.clone(), start, now, env, sink));
        }

        if edited.master_enabled {
            report = self.set_master_enabled(true, now, env, sink).or(report);
        }
        report
    }

    /// Replace the configuration.  Invalid configurations are rejected and
    /// the previous one stays in force; runtime state is kept either way.
    pub fn update_config(&mut self, config: GrowBoxConfig, sink: &mut impl EventSink) -> Result<()> {
        config.validate()?;
        self.config = config;
        for field in self.config.missing_entities() {
            warn!("Config: {} not set, its controller will stay idle", field);
        }
        sink.emit(&AppEvent::ConfigReloaded);
        info!("Configuration reloaded");
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_telemetry(&self, now: &Timestamp) -> Telemetry {
        Telemetry {
            master_enabled: self.runtime.master_enabled,
            phase: self.phase.current_phase().to_string(),
            days_in_phase: self.phase.days_in_phase(now),
            light_hours: self.phase.light_hours(&self.config),
            vpd_kpa: self.runtime.last_vpd.map(|v| (v * 100.0).round() / 100.0),
            pump_running_secs: self.runtime.pump_timer.elapsed(now).map(|d| d.num_seconds()),
            tick_count: self.tick_count,
        }
    }

    pub fn config(&self) -> &GrowBoxConfig {
        &self.config
    }

    pub fn phase_clock(&self) -> &PhaseClock {
        &self.phase
    }

    pub fn current_phase(&self) -> &str {
        self.phase.current_phase()
    }

    pub fn days_in_phase(&self, now: &Timestamp) -> u32 {
        self.phase.days_in_phase(now)
    }

    /// Last computed VPD in kPa (unrounded).
    pub fn vpd(&self) -> Option<f32> {
        self.runtime.last_vpd
    }

    pub fn master_enabled(&self) -> bool {
        self.runtime.master_enabled
    }

    pub fn pump_started_at(&self) -> Option<Timestamp> {
        self.runtime.pump_timer.started_at()
    }

    /// Enabled ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn persisted_phase(&self) -> PersistedPhase {
        self.phase.to_persisted(self.runtime.master_enabled)
    }

    // ── Persistence ───────────────────────────────────────────

    fn mark_state_dirty(&mut self, now: &Timestamp) {
        if self.dirty_since.is_none() {
            self.dirty_since = Some(*now);
        }
    }

    /// Whether phase or master state has unsaved changes.
    pub fn is_state_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Persist phase state once it has been stable for a few seconds.
    /// Returns `true` if the state was saved.
    pub fn auto_save_if_needed(&mut self, store: &impl ConfigPort, now: &Timestamp) -> bool {
        let Some(since) = self.dirty_since else {
            return false;
        };
        if now.signed_duration_since(since).num_seconds() < SAVE_SETTLE_SECS {
            return false;
        }
        self.save_state(store)
    }

    /// Save immediately if dirty (call before shutdown).
    pub fn force_save_if_dirty(&mut self, store: &impl ConfigPort) {
        if self.dirty_since.is_some() {
            self.save_state(store);
        }
    }

    fn save_state(&mut self, store: &impl ConfigPort) -> bool {
        match store.save_phase(&self.persisted_phase()) {
            Ok(()) => {
                self.dirty_since = None;
                info!("Phase state saved");
                true
            }
            Err(e) => {
                warn!("Phase state save failed: {}", e);
                false
            }
        }
    }
}

/// Send a command and report it.  Host refusals become a fault of the
/// controller that issued the command.
fn dispatch(
    controller: ControllerId,
    entity: &str,
    cmd: SwitchCommand,
    env: &mut impl Environment,
    sink: &mut impl EventSink,
) -> Result<()> {
    env.issue_command(entity, cmd)
        .map_err(|e| Error::controller(controller, e.to_string()))?;
    sink.emit(&AppEvent::CommandIssued {
        controller,
        entity: entity.to_string(),
        command: cmd,
    });
    Ok(())
}
