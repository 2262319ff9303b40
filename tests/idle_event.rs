mod common;

use std::path::Path;

use common::{Workspace, EVENT_TIMEOUT};
use file_monitor::{factory, EventFlag, MonitorType};
use file_monitor_test_utils::{init_tracing, EventRecorder, MonitorThread};

#[test]
fn quiet_poll_monitor_fires_idle_events() {
    init_tracing();
    let ws = Workspace::new();
    let recorder = EventRecorder::new();

    let mut monitor = factory::create_monitor(
        MonitorType::Poll,
        vec![ws.root.clone()],
        Some(recorder.callback()),
        None,
    )
    .unwrap();
    monitor.set_latency(0.2).unwrap();
    monitor.set_fire_idle_event(true);
    let running = MonitorThread::spawn(monitor);

    assert!(recorder.wait_for_flag(Path::new(""), EventFlag::NoOp, EVENT_TIMEOUT));
    running.stop_and_join().unwrap();

    assert!(recorder
        .events()
        .iter()
        .filter(|e| e.has_flag(EventFlag::NoOp))
        .all(|e| e.path() == Path::new("") && e.flags() == [EventFlag::NoOp]));
}

#[test]
fn idle_events_are_off_by_default() {
    let ws = Workspace::new();
    let recorder = EventRecorder::new();
    let monitor = factory::create_monitor(
        MonitorType::Poll,
        vec![ws.root.clone()],
        Some(recorder.callback()),
        None,
    )
    .unwrap();
    assert!(!monitor.config().fire_idle_event);

    let running = MonitorThread::spawn(monitor);
    std::thread::sleep(std::time::Duration::from_millis(1_500));
    running.stop_and_join().unwrap();

    assert_eq!(recorder.count_with_flag(EventFlag::NoOp), 0);
}
