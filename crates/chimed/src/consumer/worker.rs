//! Worker loop applying the handler to queued events.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use super::{CONSUMER_TARGET, IntakeQueue, SERVICE_LABELS};
use crate::handler::EventHandler;
use crate::monitor::{EVENTS_ERRORS, EVENTS_PROCESSED, Monitor};

/// Processes events until the queue is closed.
///
/// Handler failures are counted and logged; they never end the loop. A
/// handler panic is contained to the event that caused it and counted as an
/// error, so the pool keeps its size.
pub(super) fn work_loop(
    worker_id: usize,
    queue: &IntakeQueue,
    handler: &dyn EventHandler,
    monitor: &dyn Monitor,
) {
    info!(target: CONSUMER_TARGET, worker = worker_id, "starting worker");
    while let Some(event) = queue.pop() {
        let kind = event.tag();
        match panic::catch_unwind(AssertUnwindSafe(|| handler.process(event))) {
            Ok(Ok(())) => {
                debug!(target: CONSUMER_TARGET, worker = worker_id, event = %kind, "event processed");
                monitor.incr(EVENTS_PROCESSED, SERVICE_LABELS);
            }
            Ok(Err(failure)) => {
                monitor.incr(EVENTS_ERRORS, SERVICE_LABELS);
                warn!(
                    target: CONSUMER_TARGET,
                    worker = worker_id,
                    event = %kind,
                    error = %failure,
                    "handler failed; moving on"
                );
            }
            Err(payload) => {
                monitor.incr(EVENTS_ERRORS, SERVICE_LABELS);
                error!(
                    target: CONSUMER_TARGET,
                    worker = worker_id,
                    event = %kind,
                    panic = panic_message(payload.as_ref()),
                    "handler panicked; worker continues"
                );
            }
        }
    }
    info!(target: CONSUMER_TARGET, worker = worker_id, "shutting down worker");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
