//! Replies to app mentions.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};

use crate::event::{AppMention, Event, EventKind, EventsApiEvent, InnerEvent, SocketEvent};
use crate::transport::Acknowledger;

use super::{Attachment, AttachmentField, ChatApi, EventHandler, HandlerError, UserProfile};

const HANDLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handler");

const GREETING_TRIGGER: &str = "hello";
const GREETING_COLOR: &str = "#4af030";
const ASSIST_COLOR: &str = "#3d3d3d";

/// Handler that acknowledges events-API envelopes and answers mentions.
///
/// Dispatch follows the event's three levels: socket event kind, events-API
/// category, then the inner callback event. Only app mentions produce a reply;
/// other callback events and other socket kinds are logged and ignored.
#[derive(Debug)]
pub struct MentionResponder<A, C> {
    acknowledger: A,
    chat: C,
}

impl<A, C> MentionResponder<A, C>
where
    A: Acknowledger,
    C: ChatApi,
{
    /// Builds a responder from its collaborators.
    #[must_use]
    pub const fn new(acknowledger: A, chat: C) -> Self {
        Self { acknowledger, chat }
    }

    fn handle_events_api(&self, event: EventsApiEvent) -> Result<(), HandlerError> {
        match event {
            EventsApiEvent::Callback(callback) => {
                info!(
                    target: HANDLER_TARGET,
                    team = %callback.team_id,
                    "callback event received"
                );
                match callback.inner {
                    InnerEvent::AppMention(mention) => self.respond_to_mention(&mention),
                    InnerEvent::Other { event_type } => {
                        info!(
                            target: HANDLER_TARGET,
                            event_type = %event_type,
                            "callback is not an app mention; ignoring"
                        );
                        Ok(())
                    }
                }
            }
            EventsApiEvent::UrlVerification { .. } => Err(unsupported("url_verification")),
            EventsApiEvent::AppRateLimited { .. } => Err(unsupported("app_rate_limited")),
            EventsApiEvent::Unrecognized { event_type } => Err(unsupported(&event_type)),
        }
    }

    fn respond_to_mention(&self, mention: &AppMention) -> Result<(), HandlerError> {
        let user = self
            .chat
            .user_info(&mention.user)
            .map_err(|source| HandlerError::UserLookup {
                user: mention.user.clone(),
                source,
            })?;
        info!(
            target: HANDLER_TARGET,
            user = %user.name,
            channel = %mention.channel,
            "replying to mention"
        );
        let attachment = compose_reply(&user, &mention.text, &timestamp());
        self.chat
            .post_message(&mention.channel, &attachment)
            .map_err(|source| HandlerError::PostMessage {
                channel: mention.channel.clone(),
                source,
            })
    }
}

impl<A, C> EventHandler for MentionResponder<A, C>
where
    A: Acknowledger,
    C: ChatApi,
{
    fn process(&self, event: Event) -> Result<(), HandlerError> {
        let Event { kind, request } = event;
        match kind {
            SocketEvent::EventsApi(events_api) => {
                if let Some(envelope) = request.as_ref()
                    && let Err(ack_error) = self.acknowledger.ack(envelope)
                {
                    error!(
                        target: HANDLER_TARGET,
                        envelope = %envelope.envelope_id,
                        error = %ack_error,
                        "failed to acknowledge envelope"
                    );
                }
                let result = self.handle_events_api(events_api);
                if let Err(handler_error) = &result {
                    error!(
                        target: HANDLER_TARGET,
                        error = %handler_error,
                        "events api dispatch failed"
                    );
                }
                result
            }
            other => {
                info!(
                    target: HANDLER_TARGET,
                    event = %other.tag(),
                    "ignoring socket event"
                );
                Ok(())
            }
        }
    }
}

fn unsupported(detail: &str) -> HandlerError {
    HandlerError::UnsupportedEvent {
        kind: EventKind::EventsApi,
        detail: detail.to_owned(),
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Builds the reply attachment for a mention.
///
/// Text containing "hello" (in any case) gets a greeting; anything else gets
/// an offer of help. Both carry the time of the reply and the mentioning
/// user's name.
#[must_use]
pub fn compose_reply(user: &UserProfile, text: &str, now: &str) -> Attachment {
    let fields = vec![
        AttachmentField {
            title: String::from("Date"),
            value: now.to_owned(),
        },
        AttachmentField {
            title: String::from("Initializer"),
            value: user.name.clone(),
        },
    ];
    if text.to_lowercase().contains(GREETING_TRIGGER) {
        Attachment {
            pretext: String::from("Greetings"),
            text: format!("Hello {}", user.name),
            color: String::from(GREETING_COLOR),
            fields,
        }
    } else {
        Attachment {
            pretext: String::from("How can I be of service"),
            text: format!("How can I help you {}?", user.name),
            color: String::from(ASSIST_COLOR),
            fields,
        }
    }
}
