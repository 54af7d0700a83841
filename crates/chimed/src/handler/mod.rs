//! Event handlers invoked by the worker pool.
//!
//! The consumer depends only on [`EventHandler`]; any error it returns is
//! counted as a failed event and never stops the worker. [`MentionResponder`]
//! is the production handler: it acknowledges events-API envelopes and
//! replies to app mentions through a [`ChatApi`].

mod chat;
mod mention;

use std::sync::Arc;

use thiserror::Error;

use crate::event::{Event, EventKind};

pub use self::chat::{Attachment, AttachmentField, ChatApi, ChatError, UserProfile};
pub use self::mention::{MentionResponder, compose_reply};

/// Domain logic applied to each event.
///
/// Implementations are shared by every worker and must be safe to call
/// concurrently.
pub trait EventHandler: Send + Sync {
    /// Handles a single event.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the event cannot be interpreted or a
    /// downstream call fails.
    fn process(&self, event: Event) -> Result<(), HandlerError>;
}

impl<T> EventHandler for Arc<T>
where
    T: EventHandler + ?Sized,
{
    fn process(&self, event: Event) -> Result<(), HandlerError> {
        (**self).process(event)
    }
}

/// Failures reported by handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event's shape is not one the handler understands.
    #[error("unsupported {kind} event: {detail}")]
    UnsupportedEvent {
        /// Tag of the rejected event.
        kind: EventKind,
        /// Which inner shape was rejected.
        detail: String,
    },
    /// Looking up the mentioning user failed.
    #[error("failed to look up user {user}: {source}")]
    UserLookup {
        /// Identifier of the user.
        user: String,
        /// Underlying chat API error.
        #[source]
        source: ChatError,
    },
    /// Posting the reply failed.
    #[error("failed to post message to {channel}: {source}")]
    PostMessage {
        /// Channel the reply targeted.
        channel: String,
        /// Underlying chat API error.
        #[source]
        source: ChatError,
    },
}
