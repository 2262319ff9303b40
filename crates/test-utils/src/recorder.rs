#![allow(dead_code)]

use std::any::Any;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use file_monitor::{callback, Event, EventCallback, EventFlag};

/// Callback sink that keeps every delivered batch.
#[derive(Clone, Default)]
pub struct EventRecorder {
    batches: Arc<Mutex<Vec<Vec<Event>>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends each batch to this recorder.
    pub fn callback(&self) -> EventCallback {
        let batches = Arc::clone(&self.batches);
        callback(move |events: &[Event], _ctx: Option<&(dyn Any + Send + Sync)>| {
            batches.lock().unwrap().push(events.to_vec());
        })
    }

    pub fn batches(&self) -> Vec<Vec<Event>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.batches().into_iter().flatten().collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Whether some event for `path` carries `flag`.
    pub fn saw(&self, path: &Path, flag: EventFlag) -> bool {
        self.events()
            .iter()
            .any(|e| e.path() == path && e.has_flag(flag))
    }

    pub fn count_with_flag(&self, flag: EventFlag) -> usize {
        self.events().iter().filter(|e| e.has_flag(flag)).count()
    }

    /// Poll until `pred` holds for the recorded events or `timeout` expires.
    pub fn wait_for<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&[Event]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if pred(&self.events()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    /// Wait until an event for `path` carries `flag`.
    pub fn wait_for_flag(&self, path: &Path, flag: EventFlag, timeout: Duration) -> bool {
        self.wait_for(timeout, |events| {
            events.iter().any(|e| e.path() == path && e.has_flag(flag))
        })
    }
}
