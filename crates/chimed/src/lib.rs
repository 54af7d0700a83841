//! Concurrent consumer for chat workspace events.
//!
//! `chimed` reads events from a socket-mode event source and fans them out to
//! a fixed pool of worker threads. A single reader pulls events from the
//! [`EventTransport`] into a bounded [`IntakeQueue`] sized to the pool; each
//! worker hands the events it pops to an [`EventHandler`] and records the
//! outcome through a [`Monitor`]. Handler failures are counted and logged but
//! never stop a worker.
//!
//! Shutdown is cooperative. [`Consumer::stop`] cancels a broadcast
//! [`ShutdownToken`], closes the queue, and joins the reader, every worker,
//! and the transport thread before returning a [`StopReport`]. Events still
//! buffered when the queue closes are discarded and counted.
//!
//! The production handler, [`MentionResponder`], acknowledges events-API
//! envelopes and replies to app mentions over the same connection.

mod consumer;
mod event;
mod handler;
mod monitor;
mod process;
mod telemetry;
mod transport;

pub use consumer::{
    Closed, Consumer, ConsumerSettings, DEFAULT_WORKERS, IntakeQueue, POLL_INTERVAL,
    ShutdownToken, StopReport, WorkerCount,
};
pub use event::{
    AppMention, CallbackEvent, Event, EventKind, EventsApiEvent, InnerEvent, Request, SocketEvent,
};
pub use handler::{
    Attachment, AttachmentField, ChatApi, ChatError, EventHandler, HandlerError, MentionResponder,
    UserProfile, compose_reply,
};
pub use monitor::{
    EVENTS_ERRORS, EVENTS_PROCESSED, EVENTS_QUEUED, EVENTS_RECEIVED, Labels, Monitor, NoopMonitor,
    TracingMonitor, WORKERS,
};
pub use process::{
    ConfigLoader, Connection, LaunchError, ShutdownError, ShutdownSignal, SocketConnector,
    SystemConfigLoader, SystemShutdownSignal, TransportConnector, run_daemon,
};
pub use telemetry::{
    SERVICE_NAME, TelemetryError, TelemetryHandle, daemon_span, initialise as initialise_telemetry,
};
pub use transport::{Acknowledger, EventTransport, SocketChatApi, SocketTransport, TransportError};

#[cfg(test)]
mod tests;
