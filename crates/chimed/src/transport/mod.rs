//! Event transport collaborators.
//!
//! The consumer only needs two narrow contracts: [`EventTransport`] yields
//! events and runs the connection's delivery loop, and [`Acknowledger`]
//! confirms receipt of envelopes that carry a [`Request`](crate::event::Request).
//! [`SocketTransport`] implements both over a newline-delimited JSON stream.

mod connection;
mod envelope;
mod errors;
mod socket;

use std::sync::Arc;
use std::time::Duration;

use crate::consumer::ShutdownToken;
use crate::event::{Event, Request};

pub use self::errors::TransportError;
pub use self::socket::{SocketChatApi, SocketTransport};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Source of events for the consumer's reader.
pub trait EventTransport: Send + Sync {
    /// Runs the transport's own delivery loop until `shutdown` is cancelled or
    /// the connection ends. Called once, on a dedicated thread.
    fn run(&self, shutdown: &ShutdownToken);

    /// Waits at most `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once no further events can arrive.
    fn next_event(&self, timeout: Duration) -> Result<Option<Event>, TransportError>;
}

/// Acknowledges envelopes back to the remote server.
pub trait Acknowledger: Send + Sync {
    /// Sends the acknowledgement for `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the acknowledgement cannot be written.
    fn ack(&self, request: &Request) -> Result<(), TransportError>;
}

impl<T> EventTransport for Arc<T>
where
    T: EventTransport + ?Sized,
{
    fn run(&self, shutdown: &ShutdownToken) {
        (**self).run(shutdown);
    }

    fn next_event(&self, timeout: Duration) -> Result<Option<Event>, TransportError> {
        (**self).next_event(timeout)
    }
}

impl<T> Acknowledger for Arc<T>
where
    T: Acknowledger + ?Sized,
{
    fn ack(&self, request: &Request) -> Result<(), TransportError> {
        (**self).ack(request)
    }
}
