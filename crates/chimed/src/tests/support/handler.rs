//! Handler doubles with scripted outcomes.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use crate::event::Event;
use crate::handler::{EventHandler, HandlerError};

fn envelope_of(event: &Event) -> String {
    event
        .request
        .as_ref()
        .map(|request| request.envelope_id.clone())
        .unwrap_or_default()
}

fn rejection(event: &Event, envelope: &str) -> HandlerError {
    HandlerError::UnsupportedEvent {
        kind: event.tag(),
        detail: format!("scripted failure for {envelope}"),
    }
}

/// Succeeds for the listed envelope identifiers and fails for the rest.
#[derive(Default)]
pub struct ScriptedHandler {
    succeed: HashSet<String>,
    panic_on: Option<String>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedHandler {
    pub fn succeeding_on(ids: impl IntoIterator<Item = usize>) -> Self {
        Self {
            succeed: ids.into_iter().map(|id| format!("evt-{id}")).collect(),
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self::default()
    }

    pub fn with_panic_on(self, id: usize) -> Self {
        Self {
            panic_on: Some(format!("evt-{id}")),
            ..self
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl EventHandler for ScriptedHandler {
    fn process(&self, event: Event) -> Result<(), HandlerError> {
        let envelope = envelope_of(&event);
        self.seen.lock().expect("seen lock").push(envelope.clone());
        if self.panic_on.as_deref() == Some(envelope.as_str()) {
            panic!("scripted panic for {envelope}");
        }
        if self.succeed.contains(&envelope) {
            Ok(())
        } else {
            Err(rejection(&event, &envelope))
        }
    }
}

/// Handler that blocks every call until the gate opens.
#[derive(Default)]
pub struct GatedHandler {
    open: Mutex<bool>,
    opened: Condvar,
    entered: Mutex<usize>,
}

impl GatedHandler {
    pub fn open(&self) {
        *self.open.lock().expect("gate lock") = true;
        self.opened.notify_all();
    }

    pub fn entered(&self) -> usize {
        *self.entered.lock().expect("entered lock")
    }
}

impl EventHandler for GatedHandler {
    fn process(&self, _event: Event) -> Result<(), HandlerError> {
        *self.entered.lock().expect("entered lock") += 1;
        let guard = self.open.lock().expect("gate lock");
        let _open = self
            .opened
            .wait_while(guard, |open| !*open)
            .expect("gate lock");
        Ok(())
    }
}
