//! Test doubles shared by unit and behaviour suites.

mod handler;
mod monitor;
mod shutdown;
mod transport;

use std::time::{Duration, Instant};

pub use handler::{GatedHandler, ScriptedHandler};
pub use monitor::RecordingMonitor;
pub use shutdown::TestShutdownSignal;
pub use transport::ScriptedTransport;

use crate::event::{Event, Request, SocketEvent};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Builds an acknowledgeable event whose envelope identifier is `id`.
pub fn numbered_event(id: usize) -> Event {
    Event::new(SocketEvent::Hello).with_request(Request::new(format!("evt-{id}")))
}

/// Polls `condition` until it holds or the wait times out.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    condition()
}
