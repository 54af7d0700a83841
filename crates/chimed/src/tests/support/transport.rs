//! Transport double fed from the test thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::consumer::ShutdownToken;
use crate::event::Event;
use crate::transport::{EventTransport, TransportError};

#[derive(Default)]
struct Script {
    events: VecDeque<Event>,
    closed: bool,
}

/// Transport that yields queued events in order and can be closed.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    arrived: Condvar,
    runs: AtomicUsize,
    finished_runs: AtomicUsize,
}

impl ScriptedTransport {
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let transport = Self::default();
        transport.push_all(events);
        transport
    }

    pub fn push_all(&self, events: impl IntoIterator<Item = Event>) {
        let mut script = self.script.lock().expect("script lock");
        script.events.extend(events);
        drop(script);
        self.arrived.notify_all();
    }

    /// Marks the transport closed once its remaining events are consumed.
    pub fn close(&self) {
        self.script.lock().expect("script lock").closed = true;
        self.arrived.notify_all();
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock").events.len()
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn finished_runs(&self) -> usize {
        self.finished_runs.load(Ordering::SeqCst)
    }
}

impl EventTransport for ScriptedTransport {
    fn run(&self, shutdown: &ShutdownToken) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        while !shutdown.wait_timeout(Duration::from_millis(50)) {}
        self.finished_runs.fetch_add(1, Ordering::SeqCst);
    }

    fn next_event(&self, timeout: Duration) -> Result<Option<Event>, TransportError> {
        let guard = self.script.lock().expect("script lock");
        let (mut script, _) = self
            .arrived
            .wait_timeout_while(guard, timeout, |script| {
                script.events.is_empty() && !script.closed
            })
            .expect("script lock");
        match script.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if script.closed => Err(TransportError::Closed),
            None => Ok(None),
        }
    }
}
