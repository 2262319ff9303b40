#![cfg(target_os = "linux")]

mod common;

use std::fs;
use std::thread;
use std::time::Duration;

use common::{recursive_monitor, Workspace, EVENT_TIMEOUT};
use file_monitor::{EventFlag, EventTypeFilter, MonitorType};
use file_monitor_test_utils::{init_tracing, EventRecorder, MonitorThread};

/// Give the watch loop time to install watches after a (re)scan.
const SETTLE: Duration = Duration::from_millis(400);

fn start(ws: &Workspace, recorder: &EventRecorder) -> MonitorThread {
    init_tracing();
    let running = MonitorThread::spawn(recursive_monitor(MonitorType::Inotify, &ws.root, recorder));
    assert_eq!(running.monitor().backend_name(), "inotify_monitor");
    thread::sleep(SETTLE);
    running
}

#[test]
fn create_is_reported() {
    let ws = Workspace::new();
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    let file = ws.write("fresh.txt", "x");

    assert!(recorder.wait_for_flag(&file, EventFlag::Created, EVENT_TIMEOUT));
    running.stop_and_join().unwrap();
}

#[test]
fn each_path_appears_once_per_batch() {
    let ws = Workspace::new();
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    let file = ws.write("a.txt", "first line");
    fs::write(&file, "second line").unwrap();

    assert!(recorder.wait_for_flag(&file, EventFlag::Created, EVENT_TIMEOUT));
    assert!(recorder.wait_for_flag(&file, EventFlag::Updated, EVENT_TIMEOUT));
    running.stop_and_join().unwrap();

    for batch in recorder.batches() {
        let mut paths: Vec<_> = batch.iter().map(|e| e.path().to_path_buf()).collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total, "duplicate paths in batch {batch:?}");
    }
}

#[test]
fn created_file_yields_a_single_created_event() {
    init_tracing();
    let ws = Workspace::new();
    let recorder = EventRecorder::new();
    let mut monitor = recursive_monitor(MonitorType::Inotify, &ws.root, &recorder);
    monitor.add_event_type_filter(EventTypeFilter::from(EventFlag::Created));
    let running = MonitorThread::spawn(monitor);
    thread::sleep(SETTLE);

    let file = ws.write("a.txt", "x");

    assert!(recorder.wait_for_flag(&file, EventFlag::Created, EVENT_TIMEOUT));
    // Let any trailing records for the file arrive.
    thread::sleep(SETTLE);
    running.stop_and_join().unwrap();

    let for_file: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| e.path() == file)
        .collect();
    assert_eq!(for_file.len(), 1, "{for_file:?}");
    assert_eq!(for_file[0].flags(), &[EventFlag::Created]);
}

#[test]
fn scanning_a_directory_reports_its_own_listing() {
    let ws = Workspace::new();
    ws.write("sub/kept.txt", "x");
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    let sub = ws.path("sub");
    assert!(recorder.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| {
            e.path() == sub
                && e.has_flag(EventFlag::IsDir)
                && e.has_flag(EventFlag::PlatformSpecific)
        })
    }));
    running.stop_and_join().unwrap();
}

#[test]
fn write_and_close_is_an_update() {
    let ws = Workspace::new();
    let file = ws.write("data.txt", "v1");
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    fs::write(&file, "v2").unwrap();

    assert!(recorder.wait_for_flag(&file, EventFlag::Updated, EVENT_TIMEOUT));
    running.stop_and_join().unwrap();
}

#[test]
fn rename_reports_both_sides() {
    let ws = Workspace::new();
    let from = ws.write("old.txt", "x");
    let to = ws.path("new.txt");
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    fs::rename(&from, &to).unwrap();

    assert!(recorder.wait_for(EVENT_TIMEOUT, |events| {
        let moved_from = events.iter().any(|e| {
            e.path() == from && e.has_flag(EventFlag::Removed) && e.has_flag(EventFlag::MovedFrom)
        });
        let moved_to = events.iter().any(|e| {
            e.path() == to && e.has_flag(EventFlag::Created) && e.has_flag(EventFlag::MovedTo)
        });
        moved_from && moved_to
    }));
    running.stop_and_join().unwrap();
}

#[test]
fn remove_is_reported() {
    let ws = Workspace::new();
    let file = ws.write("gone.txt", "x");
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    fs::remove_file(&file).unwrap();

    assert!(recorder.wait_for_flag(&file, EventFlag::Removed, EVENT_TIMEOUT));
    running.stop_and_join().unwrap();
}

#[test]
fn new_subdirectory_is_watched() {
    let ws = Workspace::new();
    let recorder = EventRecorder::new();
    let running = start(&ws, &recorder);

    let sub = ws.path("sub");
    fs::create_dir(&sub).unwrap();
    assert!(recorder.wait_for_flag(&sub, EventFlag::Created, EVENT_TIMEOUT));
    assert!(recorder.saw(&ws.root, EventFlag::IsDir));

    thread::sleep(SETTLE);
    let nested = ws.write("sub/inner.txt", "x");

    assert!(recorder.wait_for_flag(&nested, EventFlag::Created, EVENT_TIMEOUT));
    running.stop_and_join().unwrap();
}

#[test]
fn path_filters_apply_to_kernel_events() {
    let ws = Workspace::new();
    let recorder = EventRecorder::new();

    init_tracing();
    let mut monitor = recursive_monitor(MonitorType::Inotify, &ws.root, &recorder);
    monitor
        .add_filter(&file_monitor::PathFilter::exclude(r"\.tmp$").extended())
        .unwrap();
    let running = MonitorThread::spawn(monitor);
    thread::sleep(SETTLE);

    let skipped = ws.write("scratch.tmp", "x");
    let kept = ws.write("keep.txt", "x");

    assert!(recorder.wait_for_flag(&kept, EventFlag::Created, EVENT_TIMEOUT));
    assert!(!recorder.events().iter().any(|e| e.path() == skipped));
    running.stop_and_join().unwrap();
}
