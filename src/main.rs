//! Grow box controller: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedEnvironment   LogEventSink   JsonFileStore  Clock    │
//! │  (Environment)          (EventSink)    (ConfigPort)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  PhaseClock · Light · Climate · Irrigation             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickScheduler (interval + on-demand, coalesced)               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `growbox [CONFIG_PATH] [RUN_SECS]`.  The JSON file at
//! `CONFIG_PATH` (default `growbox.json`) is re-read whenever it changes
//! on disk.  With `RUN_SECS` the loop exits after that many seconds,
//! saving any unsaved phase state first.
#![deny(unused_must_use)]

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};

use growbox::adapters::environment::SimulatedEnvironment;
use growbox::adapters::log_sink::LogEventSink;
use growbox::adapters::store::{JsonFileStore, StoreDocument};
use growbox::adapters::time::SystemClock;
use growbox::app::ports::Clock;
use growbox::app::service::ControlLoop;
use growbox::scheduler::{TickReason, TickScheduler};

const DEFAULT_CONFIG_PATH: &str = "growbox.json";
const POLL_SECS: f32 = 1.0;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  growbox v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let run_secs = args
        .next()
        .map(|raw| raw.parse::<u64>().with_context(|| format!("invalid run time '{raw}'")))
        .transpose()?;

    // ── 2. Load config + phase state (or defaults) ────────────
    let store = JsonFileStore::new(&config_path);
    let doc = match store.load_document() {
        Ok(doc) => doc,
        Err(e) => {
            warn!("{} unreadable ({}), running with defaults", config_path, e);
            StoreDocument::default()
        }
    };
    let config = match doc.config.validate() {
        Ok(()) => doc.config,
        Err(e) => {
            warn!("Config invalid ({}), using defaults", e);
            Default::default()
        }
    };

    // ── 3. Adapters ───────────────────────────────────────────
    let clock = SystemClock::new();
    let mut env = SimulatedEnvironment::from_config(&config);
    for (entity, raw) in &doc.simulated_states {
        env.set_state(entity, raw.as_str());
    }
    let mut sink = LogEventSink::new();

    // ── 4. Control loop ───────────────────────────────────────
    let now = clock.now();
    let mut scheduler = TickScheduler::new(config.tick_interval_secs);
    let mut control = ControlLoop::from_persisted(config, &doc.phase, &now);
    control.start(&mut sink);
    scheduler.request_immediate();

    info!(
        "Entering main loop (interval {}s, config {})",
        scheduler.interval_secs(),
        store.path().display()
    );

    // ── 5. Main loop ──────────────────────────────────────────
    let mut last_poll = Instant::now();
    loop {
        let polled_at = Instant::now();
        let dt = polled_at.duration_since(last_poll).as_secs_f32();
        last_poll = polled_at;
        if let Some(reason) = scheduler.poll(dt) {
            let now = clock.now();
            let report = control.tick(&now, &mut env, &mut sink);
            if reason == TickReason::OnDemand && report.ran() {
                info!("On-demand tick: {} command(s)", report.commands().count());
            }
        }

        control.auto_save_if_needed(&store, &clock.now());

        if store.modified_since_sync() {
            reload(&store, &mut control, &mut scheduler, &clock, &mut env, &mut sink);
        }

        if run_secs.is_some_and(|limit| clock.uptime_secs() >= limit) {
            break;
        }
        // Poll at least once a second so file edits are picked up promptly.
        thread::sleep(Duration::from_secs_f32(scheduler.secs_until_due().min(POLL_SECS)));
    }

    control.force_save_if_dirty(&store);
    info!("Shutting down after {} tick(s)", control.tick_count());
    Ok(())
}

/// Apply an edited file: new config first, then any phase/master change.
fn reload(
    store: &JsonFileStore,
    control: &mut ControlLoop,
    scheduler: &mut TickScheduler,
    clock: &SystemClock,
    env: &mut SimulatedEnvironment,
    sink: &mut LogEventSink,
) {
    let doc = match store.load_document() {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Reload skipped: {}", e);
            return;
        }
    };
    let now = clock.now();

    if doc.config != *control.config() {
        if let Err(e) = control.update_config(doc.config, sink) {
            warn!("Reloaded config rejected: {}", e);
        } else {
            scheduler.set_interval(control.config().tick_interval_secs);
            scheduler.request_immediate();
        }
    }

    control.apply_persisted_edit(&doc.phase, &now, env, sink);
}
