//! Integration tests for the ControlLoop → sub-controllers → environment
//! pipeline.

use growbox::app::commands::AppCommand;
use growbox::app::events::AppEvent;
use growbox::app::service::{ControlLoop, StepOutcome};
use growbox::config::{CustomPhase, GrowBoxConfig, PersistedPhase};
use growbox::control::SwitchCommand;
use growbox::error::{ControllerId, Error};
use growbox::phase::PhaseClock;

use crate::mock_env::{
    FAN, HUMIDITY, LIGHT, MOISTURE, MockEnvironment, PUMP, RecordingSink, State, TEMP, at, full_config,
    plus_secs,
};

fn make_loop(phase: &str) -> (ControlLoop, MockEnvironment, RecordingSink) {
    let now = at(10, 0);
    let mut control = ControlLoop::new(full_config(), PhaseClock::new(phase, None, &now), true);
    let mut sink = RecordingSink::new();
    control.start(&mut sink);
    (control, MockEnvironment::all_configured(), sink)
}

// ── Light ─────────────────────────────────────────────────────

#[test]
fn vegetative_light_turns_on_mid_morning() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    let report = control.tick(&at(10, 0), &mut env, &mut sink);

    assert_eq!(
        report.outcome(ControllerId::Light),
        Some(&StepOutcome::Commanded(SwitchCommand::TurnOn))
    );
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOn]);
}

#[test]
fn flowering_light_turns_off_at_six_pm() {
    let (mut control, mut env, mut sink) = make_loop("flowering");
    env.set(LIGHT, State::Switch(true));
    control.tick(&at(18, 0), &mut env, &mut sink);
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOff]);
}

#[test]
fn custom_phase_uses_its_own_hours() {
    let now = at(10, 0);
    let mut config = full_config();
    config.custom_phases.push(CustomPhase::new("Late Flower", 10.0)).unwrap();
    let mut control = ControlLoop::new(config, PhaseClock::new("Late Flower", None, &now), true);
    let mut env = MockEnvironment::all_configured();
    env.set(LIGHT, State::Switch(true));
    let mut sink = RecordingSink::new();

    control.tick(&at(15, 59), &mut env, &mut sink);
    assert!(env.calls_for(LIGHT).is_empty());
    control.tick(&at(16, 0), &mut env, &mut sink);
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOff]);
}

#[test]
fn unknown_phase_falls_back_to_twelve_hours() {
    let (mut control, mut env, mut sink) = make_loop("mystery");
    env.set(LIGHT, State::Switch(true));
    control.tick(&at(17, 59), &mut env, &mut sink);
    assert!(env.calls_for(LIGHT).is_empty());
    control.tick(&at(18, 0), &mut env, &mut sink);
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOff]);
}

// ── Idempotence ───────────────────────────────────────────────

#[test]
fn second_tick_issues_nothing_once_states_match() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.apply_commands = true;
    env.set(TEMP, State::Number(27.0));
    env.set(MOISTURE, State::Number(45.0));

    control.tick(&at(10, 0), &mut env, &mut sink);
    let first = env.calls.len();
    assert!(first >= 2, "light and fan should both have been commanded");

    control.tick(&at(10, 1), &mut env, &mut sink);
    assert_eq!(env.calls.len(), first);
}

// ── Climate ───────────────────────────────────────────────────

#[test]
fn hot_box_starts_fan_and_records_vpd() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(TEMP, State::Number(26.0));
    env.set(HUMIDITY, State::Number(50.0));
    control.tick(&at(10, 0), &mut env, &mut sink);

    assert_eq!(env.calls_for(FAN), vec![SwitchCommand::TurnOn]);
    let vpd = control.vpd().unwrap();
    assert!((vpd - 1.68).abs() < 0.01, "vpd={vpd}");
}

#[test]
fn dead_band_leaves_fan_alone() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(FAN, State::Switch(true));
    env.set(TEMP, State::Number(23.5));
    env.set(HUMIDITY, State::Number(58.0));
    let report = control.tick(&at(10, 0), &mut env, &mut sink);

    assert_eq!(report.outcome(ControllerId::Climate), Some(&StepOutcome::Idle));
    assert!(env.calls_for(FAN).is_empty());
}

#[test]
fn unavailable_humidity_keeps_last_vpd_and_skips() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    control.tick(&at(10, 0), &mut env, &mut sink);
    let before = control.vpd();
    assert!(before.is_some());

    env.set(HUMIDITY, State::Unavailable);
    env.set(TEMP, State::Number(35.0));
    let report = control.tick(&at(10, 1), &mut env, &mut sink);

    assert_eq!(control.vpd(), before);
    assert!(matches!(
        report.outcome(ControllerId::Climate),
        Some(StepOutcome::Skipped(Error::UnavailableReading(_)))
    ));
    assert!(env.calls_for(FAN).is_empty());
}

#[test]
fn missing_fan_still_computes_vpd() {
    let now = at(10, 0);
    let config = GrowBoxConfig {
        fan_entity: String::new(),
        ..full_config()
    };
    let mut control = ControlLoop::new(config, PhaseClock::new("vegetative", None, &now), true);
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    let report = control.tick(&now, &mut env, &mut sink);
    assert!(control.vpd().is_some());
    assert_eq!(
        report.outcome(ControllerId::Climate),
        Some(&StepOutcome::Skipped(Error::ConfigurationIncomplete("fan_entity")))
    );
}

// ── Irrigation ────────────────────────────────────────────────

#[test]
fn dry_soil_waters_then_cuts_off_after_max_duration() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.apply_commands = true;
    env.set(MOISTURE, State::Number(20.0));

    let t0 = at(10, 0);
    control.tick(&t0, &mut env, &mut sink);
    assert_eq!(env.calls_for(PUMP), vec![SwitchCommand::TurnOn]);
    assert_eq!(control.pump_started_at(), Some(t0));

    control.tick(&plus_secs(&t0, 60), &mut env, &mut sink);
    assert_eq!(env.calls_for(PUMP).len(), 1, "exactly max duration is not exceeded");

    control.tick(&plus_secs(&t0, 61), &mut env, &mut sink);
    assert_eq!(env.calls_for(PUMP), vec![SwitchCommand::TurnOn, SwitchCommand::TurnOff]);
    assert_eq!(control.pump_started_at(), None);
}

#[test]
fn externally_started_pump_is_timed_from_first_sighting() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(PUMP, State::Switch(true));

    let t0 = at(10, 0);
    control.tick(&t0, &mut env, &mut sink);
    assert_eq!(control.pump_started_at(), Some(t0));
    assert!(env.calls_for(PUMP).is_empty());

    control.tick(&plus_secs(&t0, 61), &mut env, &mut sink);
    assert_eq!(env.calls_for(PUMP), vec![SwitchCommand::TurnOff]);
}

#[test]
fn moisture_not_read_while_pump_runs() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(PUMP, State::Switch(true));
    env.set(MOISTURE, State::Number(5.0));
    control.tick(&at(10, 0), &mut env, &mut sink);
    assert_eq!(env.moisture_reads.get(), 0);
}

#[test]
fn no_pump_configured_is_idle() {
    let now = at(10, 0);
    let config = GrowBoxConfig {
        pump_entity: None,
        ..full_config()
    };
    let mut control = ControlLoop::new(config, PhaseClock::new("vegetative", None, &now), true);
    let mut env = MockEnvironment::all_configured();
    env.set(MOISTURE, State::Number(1.0));
    let mut sink = RecordingSink::new();

    let report = control.tick(&now, &mut env, &mut sink);
    assert_eq!(report.outcome(ControllerId::Irrigation), Some(&StepOutcome::Idle));
    assert!(env.calls_for(PUMP).is_empty());
}

// ── Fault isolation ───────────────────────────────────────────

#[test]
fn light_failure_does_not_stop_climate_or_irrigation() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.fail_commands_for(LIGHT);
    env.set(TEMP, State::Number(30.0));
    env.set(MOISTURE, State::Number(10.0));

    let report = control.tick(&at(10, 0), &mut env, &mut sink);

    assert!(matches!(
        report.outcome(ControllerId::Light),
        Some(StepOutcome::Failed(Error::Controller {
            controller: ControllerId::Light,
            ..
        }))
    ));
    assert_eq!(env.calls_for(FAN), vec![SwitchCommand::TurnOn]);
    assert_eq!(env.calls_for(PUMP), vec![SwitchCommand::TurnOn]);
    assert_eq!(sink.failures(), 1);
}

#[test]
fn rejected_pump_command_is_retried_next_tick() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(MOISTURE, State::Number(10.0));
    env.fail_commands_for(PUMP);

    control.tick(&at(10, 0), &mut env, &mut sink);
    assert_eq!(control.pump_started_at(), None);

    env.failing = None;
    control.tick(&at(10, 1), &mut env, &mut sink);
    assert_eq!(env.calls_for(PUMP), vec![SwitchCommand::TurnOn]);
    assert_eq!(control.pump_started_at(), Some(at(10, 1)));
}

#[test]
fn empty_config_skips_everything_quietly() {
    let now = at(10, 0);
    let mut control = ControlLoop::new(
        GrowBoxConfig::default(),
        PhaseClock::new("vegetative", None, &now),
        true,
    );
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    let report = control.tick(&now, &mut env, &mut sink);
    assert!(report.ran());
    assert_eq!(report.failures().count(), 0);
    assert!(env.calls.is_empty());
}

// ── Master switch ─────────────────────────────────────────────

#[test]
fn disabled_master_suppresses_all_commands() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(TEMP, State::Number(35.0));
    env.set(MOISTURE, State::Number(5.0));

    control.handle_command(AppCommand::SetMasterEnabled(false), &at(10, 0), &mut env, &mut sink);
    for minute in 0..5 {
        let report = control.tick(&at(10, minute), &mut env, &mut sink);
        assert!(!report.ran());
    }
    assert!(env.calls.is_empty());
    assert_eq!(control.tick_count(), 0);
}

#[test]
fn enabling_master_runs_immediate_tick() {
    let now = at(10, 0);
    let mut control = ControlLoop::new(full_config(), PhaseClock::new("vegetative", None, &now), false);
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    let report = control
        .handle_command(AppCommand::SetMasterEnabled(true), &now, &mut env, &mut sink)
        .expect("enabling must tick");
    assert!(report.ran());
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOn]);
    assert!(sink.events.contains(&AppEvent::MasterToggled(true)));
}

#[test]
fn disabled_loop_keeps_pump_timer_frozen() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    env.set(PUMP, State::Switch(true));
    let t0 = at(10, 0);
    control.tick(&t0, &mut env, &mut sink);
    assert_eq!(control.pump_started_at(), Some(t0));

    control.set_master_enabled(false, &t0, &mut env, &mut sink);
    control.tick(&plus_secs(&t0, 600), &mut env, &mut sink);
    assert_eq!(control.pump_started_at(), Some(t0));
    assert!(env.calls_for(PUMP).is_empty());
}

// ── Phase changes ─────────────────────────────────────────────

#[test]
fn phase_change_resets_day_counter_and_retimes_light() {
    let start = at(10, 0) - chrono::Duration::days(12);
    let mut control = ControlLoop::new(
        full_config(),
        PhaseClock::new("vegetative", Some(start), &at(10, 0)),
        true,
    );
    let mut env = MockEnvironment::all_configured();
    env.set(LIGHT, State::Switch(true));
    let mut sink = RecordingSink::new();
    let evening = at(19, 0);
    assert_eq!(control.days_in_phase(&evening), 12);

    let report = control
        .handle_command(
            AppCommand::SetPhase {
                phase: "flowering".into(),
                start: None,
            },
            &evening,
            &mut env,
            &mut sink,
        )
        .expect("phase change must tick");

    assert_eq!(control.current_phase(), "flowering");
    assert_eq!(control.days_in_phase(&evening), 0);
    assert_eq!(
        report.outcome(ControllerId::Light),
        Some(&StepOutcome::Commanded(SwitchCommand::TurnOff))
    );
    assert!(sink.events.contains(&AppEvent::PhaseChanged {
        from: "vegetative".into(),
        to: "flowering".into(),
    }));
}

#[test]
fn reselecting_same_phase_keeps_start() {
    let start = at(10, 0) - chrono::Duration::days(3);
    let mut control = ControlLoop::new(
        full_config(),
        PhaseClock::new("flowering", Some(start), &at(10, 0)),
        true,
    );
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    control.set_phase("flowering", None, &at(10, 0), &mut env, &mut sink);
    assert_eq!(control.days_in_phase(&at(10, 0)), 3);
    assert!(!control.is_state_dirty());
}

#[test]
fn edit_disabling_master_with_phase_change_stays_idle() {
    let (mut control, mut env, mut sink) = make_loop("vegetative");
    let evening = at(19, 0);
    control.tick(&evening, &mut env, &mut sink);
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOn]);
    env.calls.clear();

    let edited = PersistedPhase {
        phase: "drying".into(),
        phase_start: None,
        master_enabled: false,
    };
    let report = control.apply_persisted_edit(&edited, &evening, &mut env, &mut sink);

    assert!(!report.is_some_and(|r| r.ran()));
    assert!(env.calls.is_empty());
    assert_eq!(control.current_phase(), "drying");
    assert!(!control.master_enabled());
}

#[test]
fn edit_enabling_master_ticks_with_new_phase() {
    let now = at(19, 0);
    let mut control = ControlLoop::new(full_config(), PhaseClock::new("vegetative", None, &now), false);
    let mut env = MockEnvironment::all_configured();
    env.set(LIGHT, State::Switch(true));
    let mut sink = RecordingSink::new();

    let edited = PersistedPhase {
        phase: "flowering".into(),
        phase_start: None,
        master_enabled: true,
    };
    let report = control
        .apply_persisted_edit(&edited, &now, &mut env, &mut sink)
        .expect("enabling must tick");

    assert_eq!(
        report.outcome(ControllerId::Light),
        Some(&StepOutcome::Commanded(SwitchCommand::TurnOff))
    );
    assert_eq!(env.calls_for(LIGHT), vec![SwitchCommand::TurnOff]);
    assert!(control.master_enabled());
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn every_enabled_tick_emits_telemetry() {
    let (mut control, mut env, mut sink) = make_loop("seedling");
    control.tick(&at(10, 0), &mut env, &mut sink);
    control.tick(&at(10, 1), &mut env, &mut sink);

    let telemetry: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(telemetry.len(), 2);
    assert_eq!(telemetry[1].tick_count, 2);
    assert_eq!(telemetry[1].phase, "seedling");
    assert!((telemetry[1].light_hours - 18.0).abs() < f32::EPSILON);
}
