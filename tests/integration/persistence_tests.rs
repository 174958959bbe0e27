//! Persistence round-trips through the ConfigPort adapters.

use growbox::adapters::store::{JsonFileStore, MemoryStore};
use growbox::app::commands::AppCommand;
use growbox::app::ports::ConfigPort;
use growbox::app::service::ControlLoop;
use growbox::config::PersistedPhase;

use crate::mock_env::{MockEnvironment, RecordingSink, at, full_config, plus_secs};

#[test]
fn restart_restores_phase_start_and_master() {
    let store = MemoryStore::new();
    let now = at(9, 0);
    let persisted = PersistedPhase {
        phase: "vegetative".into(),
        phase_start: None,
        master_enabled: true,
    };
    let mut control = ControlLoop::from_persisted(full_config(), &persisted, &now);
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    control.set_phase("flowering", None, &now, &mut env, &mut sink);
    control.set_master_enabled(false, &now, &mut env, &mut sink);
    control.force_save_if_dirty(&store);
    assert!(!control.is_state_dirty());

    let later = now + chrono::Duration::days(4);
    let restored = ControlLoop::from_persisted(full_config(), &store.load_phase().unwrap(), &later);
    assert_eq!(restored.current_phase(), "flowering");
    assert_eq!(restored.days_in_phase(&later), 4);
    assert!(!restored.master_enabled());
    // Runtime state is never persisted.
    assert_eq!(restored.pump_started_at(), None);
}

#[test]
fn malformed_start_is_replaced_by_now() {
    let now = at(9, 0);
    let persisted = PersistedPhase {
        phase: "seedling".into(),
        phase_start: Some("yesterday-ish".into()),
        master_enabled: true,
    };
    let control = ControlLoop::from_persisted(full_config(), &persisted, &now);
    assert_eq!(control.phase_clock().phase_start(), now);
    assert_eq!(control.days_in_phase(&now), 0);
    assert!(control.is_state_dirty());
}

#[test]
fn defaulted_start_survives_later_restarts() {
    let store = MemoryStore::new();
    let t0 = at(9, 0);
    let mut control = ControlLoop::from_persisted(full_config(), &PersistedPhase::default(), &t0);
    assert!(control.is_state_dirty());
    assert!(control.auto_save_if_needed(&store, &plus_secs(&t0, 5)));

    let saved = store.load_phase().unwrap();
    assert!(saved.phase_start.is_some());

    let later = t0 + chrono::Duration::days(3);
    let restored = ControlLoop::from_persisted(full_config(), &saved, &later);
    assert_eq!(restored.phase_clock().phase_start(), t0);
    assert_eq!(restored.days_in_phase(&later), 3);
    assert!(!restored.is_state_dirty());
}

#[test]
fn future_start_is_clamped() {
    let now = at(9, 0);
    let persisted = PersistedPhase {
        phase: "seedling".into(),
        phase_start: Some("2030-01-01T00:00:00+02:00".into()),
        master_enabled: true,
    };
    let control = ControlLoop::from_persisted(full_config(), &persisted, &now);
    assert_eq!(control.phase_clock().phase_start(), now);
}

#[test]
fn explicit_start_sets_day_count() {
    let now = at(9, 0);
    let mut control = ControlLoop::from_persisted(full_config(), &PersistedPhase::default(), &now);
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    control.handle_command(
        AppCommand::SetPhase {
            phase: "vegetative".into(),
            start: Some(now - chrono::Duration::days(9)),
        },
        &now,
        &mut env,
        &mut sink,
    );
    assert_eq!(control.days_in_phase(&now), 9);
    assert!(control.is_state_dirty());
}

#[test]
fn auto_save_writes_json_after_settling() {
    let dir = std::env::temp_dir().join(format!("growbox-persist-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("growbox.json");
    let _ = std::fs::remove_file(&path);
    let store = JsonFileStore::new(&path);
    store.save_config(&full_config()).unwrap();

    let now = at(9, 0);
    let mut control = ControlLoop::from_persisted(store.load_config().unwrap(), &store.load_phase().unwrap(), &now);
    let mut env = MockEnvironment::all_configured();
    let mut sink = RecordingSink::new();

    control.set_phase("drying", None, &now, &mut env, &mut sink);
    assert!(!control.auto_save_if_needed(&store, &plus_secs(&now, 2)));
    assert!(control.auto_save_if_needed(&store, &plus_secs(&now, 6)));

    let saved = store.load_phase().unwrap();
    assert_eq!(saved.phase, "drying");
    assert_eq!(store.load_config().unwrap(), full_config());
    let _ = std::fs::remove_file(&path);
}
