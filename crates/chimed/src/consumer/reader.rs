//! Reader loop moving events from the transport into the intake queue.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CONSUMER_TARGET, Closed, IntakeQueue, SERVICE_LABELS, ShutdownToken};
use crate::monitor::{EVENTS_QUEUED, EVENTS_RECEIVED, Monitor};
use crate::transport::{EventTransport, TransportError};

/// Forwards events until shutdown, queue closure, or transport closure.
///
/// Each wait on the transport is bounded by `poll_interval`, so cancellation
/// is observed within one interval even when no events arrive. Returns the
/// number of events taken from the transport that the closed queue refused.
pub(super) fn read_loop(
    transport: &dyn EventTransport,
    queue: &IntakeQueue,
    monitor: &dyn Monitor,
    shutdown: &ShutdownToken,
    poll_interval: Duration,
) -> usize {
    let mut rejected_events = 0;
    info!(target: CONSUMER_TARGET, "starting reader");
    while !shutdown.is_cancelled() {
        match transport.next_event(poll_interval) {
            Ok(Some(event)) => {
                let kind = event.tag();
                if let Err(Closed(rejected)) = queue.push(event) {
                    debug!(
                        target: CONSUMER_TARGET,
                        event = %rejected.tag(),
                        "intake queue closed; dropping event"
                    );
                    rejected_events += 1;
                    break;
                }
                debug!(target: CONSUMER_TARGET, event = %kind, "event queued");
                monitor.incr(EVENTS_RECEIVED, SERVICE_LABELS);
                monitor.gauge(
                    EVENTS_QUEUED,
                    i64::try_from(queue.len()).unwrap_or(i64::MAX),
                    SERVICE_LABELS,
                );
            }
            Ok(None) => {}
            Err(TransportError::Closed) => {
                info!(target: CONSUMER_TARGET, "transport closed; reader exiting");
                break;
            }
            Err(error) => {
                warn!(
                    target: CONSUMER_TARGET,
                    error = %error,
                    "transport read failed"
                );
                if shutdown.wait_timeout(poll_interval) {
                    break;
                }
            }
        }
    }
    info!(target: CONSUMER_TARGET, rejected_events, "shutting down reader");
    rejected_events
}
