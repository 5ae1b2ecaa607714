use fakeloc::bridge::{ConfigBridge, MemorySource};
use fakeloc::constants::*;
use fakeloc::gate::{ActivationGate, GateDecision, GateState};
use fakeloc::hooks::registry::HookRegistry;
use fakeloc::hooks::{AppContext, LocationApi};
use fakeloc::location::LocationRecord;
use fakeloc::store::Preferences;
use fakeloc::TargetProcess;
use std::sync::Arc;

fn source_with(f: impl FnOnce(&mut Preferences)) -> Arc<MemorySource> {
    let mut prefs = Preferences::new();
    f(&mut prefs);
    Arc::new(MemorySource::new(prefs))
}

fn scenario_source() -> Arc<MemorySource> {
    source_with(|p| {
        p.put_bool(KEY_IS_PLAYING, true);
        p.put_bool(KEY_USE_ACCURACY, true);
        p.put_double(KEY_ACCURACY, 5.0);
        p.put_bool(KEY_USE_ALTITUDE, false);
        p.put_bool(KEY_USE_RANDOMIZE, false);
        p.put_json(
            KEY_LAST_CLICKED_LOCATION,
            &LocationRecord::new(37.0, -122.0).with_altitude(10.0),
        )
        .unwrap();
    })
}

#[test]
fn test_manager_package_never_hooks() {
    for playing in [false, true] {
        let source = source_with(|p| p.put_bool(KEY_IS_PLAYING, playing));
        let mut process = TargetProcess::new(MANAGER_PACKAGE_NAME, ConfigBridge::new(source));

        let (decision, report) = process.start();
        assert_eq!(decision, GateDecision::SkipManager);
        assert!(report.is_none());
        assert_eq!(process.gate_state(), GateState::Inactive);
        assert!(!process.is_hooked(LocationApi::LastKnownLocation));
    }
}

#[test]
fn test_empty_store_stays_inactive() {
    let source = Arc::new(MemorySource::default());
    let mut process = TargetProcess::new("com.example.maps", ConfigBridge::new(source));

    let (decision, report) = process.start();
    assert_eq!(decision, GateDecision::SkipInactive);
    assert!(report.is_none());
    assert_eq!(process.gate_state(), GateState::Inactive);
}

#[test]
fn test_activation_is_not_retried() {
    let source = Arc::new(MemorySource::default());
    let gate = ActivationGate::new(ConfigBridge::new(source.clone()));
    let mut registry = HookRegistry::new();

    assert_eq!(gate.handle_load_package("com.example.maps"), GateDecision::SkipInactive);

    // Switched on after the process loaded: this process stays untouched
    source.update(|p| p.put_bool(KEY_IS_PLAYING, true));
    assert_eq!(gate.handle_load_package("com.example.maps"), GateDecision::SkipInactive);
    assert!(gate
        .on_application_create(AppContext::new("com.example.maps"), &mut registry)
        .is_none());
    assert_eq!(gate.state(), GateState::Inactive);
}

#[test]
fn test_hooks_install_exactly_once() {
    let gate = ActivationGate::new(ConfigBridge::new(scenario_source()));
    let mut registry = HookRegistry::new();

    assert_eq!(gate.handle_load_package("com.example.maps"), GateDecision::Arm);
    assert_eq!(gate.state(), GateState::Inactive);

    let report = gate
        .on_application_create(AppContext::new("com.example.maps"), &mut registry)
        .expect("first application create installs hooks");
    assert!(report.all_installed());
    assert_eq!(report.installed, LocationApi::ALL.to_vec());
    assert_eq!(gate.state(), GateState::HooksInstalled);
    assert_eq!(
        gate.hooked_context().map(|c| c.package_name),
        Some("com.example.maps".to_string())
    );

    assert!(gate
        .on_application_create(AppContext::new("com.example.maps"), &mut registry)
        .is_none());
}

#[test]
fn test_create_before_load_does_nothing() {
    let gate = ActivationGate::new(ConfigBridge::new(scenario_source()));
    let mut registry = HookRegistry::new();
    assert!(gate
        .on_application_create(AppContext::new("com.example.maps"), &mut registry)
        .is_none());
    assert_eq!(gate.state(), GateState::Inactive);
}

#[test]
fn test_hook_failures_are_isolated() {
    let registry = HookRegistry::with_unsupported([LocationApi::CurrentLocation]);
    let mut process =
        TargetProcess::with_registry("com.example.maps", ConfigBridge::new(scenario_source()), registry);

    let (decision, report) = process.start();
    let report = report.expect("hooks installed");
    assert_eq!(decision, GateDecision::Arm);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, LocationApi::CurrentLocation);
    assert_eq!(report.installed.len(), LocationApi::ALL.len() - 1);
    assert_eq!(process.gate_state(), GateState::HooksInstalled);

    let real = LocationRecord::new(1.0, 1.0);
    let spoofed = process
        .query_location(LocationApi::LastKnownLocation, Some(real.clone()))
        .unwrap();
    assert_eq!((spoofed.latitude, spoofed.longitude), (37.0, -122.0));

    // The entry point that failed to hook behaves like an unmodified device
    assert_eq!(
        process.query_location(LocationApi::CurrentLocation, Some(real.clone())),
        Some(real)
    );
}

#[test]
fn test_scenario_synthesized_output() {
    let mut process = TargetProcess::new("com.example.maps", ConfigBridge::new(scenario_source()));
    process.start();

    for api in [
        LocationApi::LastKnownLocation,
        LocationApi::CurrentLocation,
        LocationApi::LocationUpdates,
    ] {
        let out = process.query_location(api, None).expect("spoofed location");
        assert_eq!(out.latitude, 37.0);
        assert_eq!(out.longitude, -122.0);
        assert_eq!(out.altitude, Some(10.0));
        assert_eq!(out.accuracy, Some(5.0));
    }
    assert!(process.query_provider_enabled("gps", false));
    assert!(process.query_provider_enabled("network", false));
    assert!(!process.query_provider_enabled("bluetooth", false));
}

#[test]
fn test_malformed_location_falls_back_to_real() {
    let source = source_with(|p| {
        p.put_bool(KEY_IS_PLAYING, true);
        p.put_bool(KEY_USE_ACCURACY, true);
        p.put_double(KEY_ACCURACY, 5.0);
        p.put_text(KEY_LAST_CLICKED_LOCATION, "not json at all");
    });
    let mut process = TargetProcess::new("com.example.maps", ConfigBridge::new(source));
    process.start();
    assert_eq!(process.gate_state(), GateState::HooksInstalled);

    let real = LocationRecord::new(52.52, 13.405).with_accuracy(8.0);
    assert_eq!(
        process.query_location(LocationApi::LocationUpdates, Some(real.clone())),
        Some(real)
    );
    assert_eq!(process.query_location(LocationApi::LastKnownLocation, None), None);
    assert!(!process.query_provider_enabled("gps", false));
}

#[test]
fn test_settings_changes_apply_to_running_hooks() {
    let source = scenario_source();
    let mut process = TargetProcess::new("com.example.maps", ConfigBridge::new(source.clone()));
    process.start();

    source.update(|p| {
        p.put_json(KEY_LAST_CLICKED_LOCATION, &LocationRecord::new(-33.86, 151.21))
            .unwrap();
        p.put_bool(KEY_USE_ALTITUDE, true);
        p.put_double(KEY_ALTITUDE, 42.0);
    });

    let out = process.query_location(LocationApi::LastKnownLocation, None).unwrap();
    assert_eq!((out.latitude, out.longitude), (-33.86, 151.21));
    assert_eq!(out.altitude, Some(42.0));
}

#[test]
fn test_concurrent_queries_across_entry_points() {
    let source = scenario_source();
    source.update(|p| {
        p.put_bool(KEY_USE_RANDOMIZE, true);
        p.put_double(KEY_RANDOMIZE_RADIUS, 100.0);
    });
    let mut process = TargetProcess::new("com.example.maps", ConfigBridge::new(source));
    process.start();
    let process = Arc::new(process);

    let handles: Vec<_> = LocationApi::ALL[..3]
        .iter()
        .map(|api| {
            let process = process.clone();
            let api = *api;
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let out = process.query_location(api, None).unwrap();
                    let d = fakeloc::synthesis::great_circle_distance(
                        37.0,
                        -122.0,
                        out.latitude,
                        out.longitude,
                    );
                    assert!(d <= 100.0 + 1e-6);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("query thread panicked");
    }
}
