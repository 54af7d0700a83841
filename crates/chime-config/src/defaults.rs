//! Built-in defaults applied when no configuration source sets a value.

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Worker pool size used when the requested count is missing or below one.
pub const DEFAULT_WORKERS: u16 = 5;

/// Default endpoint of the remote event source.
pub const DEFAULT_EVENT_SOURCE: &str = "tcp://127.0.0.1:9780";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the daemon.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the daemon.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint dialled when no event source is configured.
#[must_use]
pub fn default_event_source() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 9780)
}
