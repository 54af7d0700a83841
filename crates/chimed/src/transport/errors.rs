//! Error types for transport operations.

use std::io;

use thiserror::Error;

/// Errors surfaced while connecting to or exchanging frames with the event
/// source.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting to the configured endpoint failed.
    #[error("failed to connect to event source {endpoint}: {source}")]
    Connect {
        /// Endpoint that refused the connection.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Endpoint that was requested.
        endpoint: String,
    },
    /// Configuring the connected stream failed.
    #[error("failed to configure event source connection: {source}")]
    Configure {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing an outbound frame failed.
    #[error("failed to write {frame} frame: {source}")]
    Write {
        /// Kind of frame being written.
        frame: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising an outbound frame failed.
    #[error("failed to encode {frame} frame: {source}")]
    Encode {
        /// Kind of frame being encoded.
        frame: &'static str,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// The connection ended and no further events will arrive.
    #[error("event source connection closed")]
    Closed,
}
