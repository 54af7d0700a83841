//! Wire format for frames exchanged with the event source.
//!
//! Inbound frames are JSON objects, one per line:
//!
//! ```json
//! {"envelope_id":"1d2f","type":"events_api","payload":{"type":"event_callback", ...}}
//! ```
//!
//! Outbound frames are acknowledgements (`{"envelope_id":"1d2f"}`), the
//! optional authentication frame, and chat messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{
    AppMention, CallbackEvent, Event, EventsApiEvent, InnerEvent, Request, SocketEvent,
};
use crate::handler::Attachment;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackPayload {
    #[serde(default)]
    team_id: String,
    #[serde(default)]
    event: Option<Value>,
}

/// Decodes one inbound line into an [`Event`].
///
/// Unknown envelope and payload types decode into the catch-all variants so
/// the handler can log them; only malformed JSON is an error.
pub(super) fn decode_envelope(line: &[u8]) -> Result<Event, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(line)?;
    let kind = match envelope.kind.as_str() {
        "hello" => SocketEvent::Hello,
        "disconnect" => SocketEvent::Disconnect {
            reason: envelope.reason.unwrap_or_default(),
        },
        "events_api" => SocketEvent::EventsApi(decode_events_api(envelope.payload)),
        "interactive" => SocketEvent::Interactive(envelope.payload),
        "slash_commands" => SocketEvent::SlashCommand(envelope.payload),
        _ => SocketEvent::Unknown {
            event_type: envelope.kind,
        },
    };
    let event = Event::new(kind);
    Ok(match envelope.envelope_id {
        Some(envelope_id) => event.with_request(Request { envelope_id }),
        None => event,
    })
}

fn type_of(value: &Value) -> String {
    value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn decode_events_api(payload: Value) -> EventsApiEvent {
    let event_type = type_of(&payload);
    let decoded = match event_type.as_str() {
        "event_callback" => {
            serde_json::from_value::<CallbackPayload>(payload).and_then(|callback| {
                let event = callback
                    .event
                    .ok_or_else(|| serde::de::Error::missing_field("event"))?;
                Ok(EventsApiEvent::Callback(CallbackEvent {
                    team_id: callback.team_id,
                    inner: decode_inner(event),
                }))
            })
        }
        "url_verification" => payload
            .get("challenge")
            .and_then(Value::as_str)
            .map(|challenge| EventsApiEvent::UrlVerification {
                challenge: challenge.to_owned(),
            })
            .ok_or_else(|| serde::de::Error::missing_field("challenge")),
        "app_rate_limited" => payload
            .get("minute_rate_limited")
            .and_then(Value::as_i64)
            .map(|minute_rate_limited| EventsApiEvent::AppRateLimited {
                minute_rate_limited,
            })
            .ok_or_else(|| serde::de::Error::missing_field("minute_rate_limited")),
        _ => Err(serde::de::Error::custom("unrecognised events api type")),
    };
    decoded.unwrap_or(EventsApiEvent::Unrecognized { event_type })
}

fn decode_inner(event: Value) -> InnerEvent {
    let event_type = type_of(&event);
    if event_type == "app_mention"
        && let Ok(mention) = serde_json::from_value::<AppMention>(event)
    {
        return InnerEvent::AppMention(mention);
    }
    InnerEvent::Other { event_type }
}

#[derive(Debug, Serialize)]
pub(super) struct AckFrame<'a> {
    pub(super) envelope_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(super) enum OutboundFrame<'a> {
    #[serde(rename = "auth")]
    Auth { token: &'a str },
    #[serde(rename = "chat.postMessage")]
    PostMessage {
        channel: &'a str,
        attachments: [&'a Attachment; 1],
    },
}

impl OutboundFrame<'_> {
    pub(super) const fn name(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::PostMessage { .. } => "chat.postMessage",
        }
    }
}

/// Serialises a frame as a single newline-terminated JSON line.
pub(super) fn encode_line<T: Serialize>(frame: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    Ok(line)
}
