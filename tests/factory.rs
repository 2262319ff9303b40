use std::path::PathBuf;

use file_monitor::errors::MonitorError;
use file_monitor::{callback, factory, Event, EventCallback, MonitorType};

fn noop() -> Option<EventCallback> {
    Some(callback(|_: &[Event], _| {}))
}

fn paths() -> Vec<PathBuf> {
    vec![PathBuf::from("/w")]
}

#[test]
fn every_registered_name_builds_a_monitor() {
    for name in factory::get_types() {
        assert!(factory::exists_type(&name));
        let monitor = factory::create_monitor_by_name(&name, paths(), noop(), None)
            .unwrap()
            .unwrap();
        assert_eq!(monitor.backend_name(), name);
    }
}

#[test]
fn names_round_trip_through_monitor_type() {
    for name in factory::get_types() {
        let monitor_type: MonitorType = name.parse().unwrap();
        assert_eq!(monitor_type.to_string(), name);
    }
    assert!(matches!(
        "fsevents_monitor".parse::<MonitorType>(),
        Err(MonitorError::UnknownMonitorType(_))
    ));
}

#[test]
fn unknown_name_yields_none_but_bad_arguments_still_fail() {
    assert!(!factory::exists_type("fsevents_monitor"));
    assert!(factory::create_monitor_by_name("fsevents_monitor", paths(), noop(), None)
        .unwrap()
        .is_none());

    let err = factory::create_monitor_by_name("poll_monitor", paths(), None, None).unwrap_err();
    assert!(matches!(err, MonitorError::CallbackNotSet));
}

#[test]
fn system_default_resolves_to_a_registered_backend() {
    let monitor = factory::create_monitor(MonitorType::SystemDefault, paths(), noop(), None).unwrap();
    assert_eq!(monitor.backend_name(), factory::default_type().name());
    assert!(factory::exists_type(monitor.backend_name()));
}
