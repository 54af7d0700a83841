//! Events delivered by the socket transport.
//!
//! An [`Event`] pairs a [`SocketEvent`] with the optional acknowledgement
//! token issued by the remote server. The payload is a three-level tagged
//! union: socket event kind, then events-API category, then the inner
//! callback event. Handlers match on variants rather than inspecting tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Acknowledgement token attached to envelopes that expect an ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Identifier echoed back to the server when acknowledging.
    pub envelope_id: String,
}

impl Request {
    /// Builds a request token.
    #[must_use]
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
        }
    }
}

/// One unit of work received from the transport.
///
/// Events move from the reader into the intake queue and then into exactly
/// one worker. The type is not `Clone`.
#[derive(Debug, PartialEq)]
pub struct Event {
    /// Tagged payload.
    pub kind: SocketEvent,
    /// Acknowledgement token, when the envelope carried one.
    pub request: Option<Request>,
}

impl Event {
    /// Builds an event without an acknowledgement token.
    #[must_use]
    pub const fn new(kind: SocketEvent) -> Self {
        Self {
            kind,
            request: None,
        }
    }

    /// Attaches an acknowledgement token.
    #[must_use]
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Field-less tag used in logs.
    #[must_use]
    pub fn tag(&self) -> EventKind {
        self.kind.tag()
    }
}

/// Top-level socket event categories.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Server greeting sent after the connection opens.
    Hello,
    /// Transport is establishing a connection.
    Connecting,
    /// Transport finished connecting.
    Connected,
    /// Server asked the client to disconnect.
    Disconnect {
        /// Reason supplied by the server.
        reason: String,
    },
    /// Events API delivery.
    EventsApi(EventsApiEvent),
    /// Interactive component payload, kept opaque.
    Interactive(serde_json::Value),
    /// Slash command payload, kept opaque.
    SlashCommand(serde_json::Value),
    /// Envelope type this daemon does not model.
    Unknown {
        /// Raw envelope type.
        event_type: String,
    },
}

impl SocketEvent {
    /// Field-less tag for the variant.
    #[must_use]
    pub fn tag(&self) -> EventKind {
        match self {
            Self::Hello => EventKind::Hello,
            Self::Connecting => EventKind::Connecting,
            Self::Connected => EventKind::Connected,
            Self::Disconnect { .. } => EventKind::Disconnect,
            Self::EventsApi(_) => EventKind::EventsApi,
            Self::Interactive(_) => EventKind::Interactive,
            Self::SlashCommand(_) => EventKind::SlashCommand,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }
}

/// Discriminant of [`SocketEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`SocketEvent::Hello`].
    Hello,
    /// See [`SocketEvent::Connecting`].
    Connecting,
    /// See [`SocketEvent::Connected`].
    Connected,
    /// See [`SocketEvent::Disconnect`].
    Disconnect,
    /// See [`SocketEvent::EventsApi`].
    EventsApi,
    /// See [`SocketEvent::Interactive`].
    Interactive,
    /// See [`SocketEvent::SlashCommand`].
    SlashCommand,
    /// See [`SocketEvent::Unknown`].
    Unknown,
}

impl EventKind {
    /// Wire name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnect => "disconnect",
            Self::EventsApi => "events_api",
            Self::Interactive => "interactive",
            Self::SlashCommand => "slash_commands",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Events API categories.
#[derive(Debug, Clone, PartialEq)]
pub enum EventsApiEvent {
    /// Workspace event wrapped in a callback.
    Callback(CallbackEvent),
    /// Endpoint ownership challenge.
    UrlVerification {
        /// Challenge string.
        challenge: String,
    },
    /// Deliveries were rate limited by the server.
    AppRateLimited {
        /// Minute the limit applies to.
        minute_rate_limited: i64,
    },
    /// Category this daemon does not model.
    Unrecognized {
        /// Raw category.
        event_type: String,
    },
}

/// Callback wrapper around a workspace event.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    /// Workspace the event originates from.
    pub team_id: String,
    /// The wrapped event.
    pub inner: InnerEvent,
}

/// Workspace events carried by callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum InnerEvent {
    /// The bot was mentioned in a channel.
    AppMention(AppMention),
    /// Any other workspace event.
    Other {
        /// Raw event type.
        event_type: String,
    },
}

/// Payload of an `app_mention` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMention {
    /// Identifier of the mentioning user.
    pub user: String,
    /// Message text, including the mention.
    pub text: String,
    /// Channel the mention happened in.
    pub channel: String,
    /// Message timestamp.
    #[serde(default)]
    pub ts: String,
}
