//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade, one tagged line per event.  A future MQTT or
//! dashboard adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                let vpd = t.vpd_kpa.map_or_else(|| "-".to_string(), |v| format!("{v:.2}kPa"));
                let pump = t
                    .pump_running_secs
                    .map_or_else(|| "idle".to_string(), |s| format!("{s}s"));
                info!(
                    "TELEM | master={} | phase={} day={} light={}h | vpd={} | pump={} | tick={}",
                    if t.master_enabled { "on" } else { "off" },
                    t.phase,
                    t.days_in_phase,
                    t.light_hours,
                    vpd,
                    pump,
                    t.tick_count,
                );
            }
            AppEvent::CommandIssued {
                controller,
                entity,
                command,
            } => {
                info!("CMD | {} | {} {}", controller, entity, command);
            }
            AppEvent::ControllerFailed { controller, reason } => {
                warn!("FAULT | {} | {}", controller, reason);
            }
            AppEvent::MasterToggled(enabled) => {
                info!("MASTER | {}", if *enabled { "on" } else { "off" });
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from, to);
            }
            AppEvent::ConfigReloaded => {
                info!("CONFIG | reloaded");
            }
            AppEvent::Started {
                phase,
                master_enabled,
            } => {
                info!(
                    "START | phase={} master={}",
                    phase,
                    if *master_enabled { "on" } else { "off" }
                );
            }
        }
    }
}
