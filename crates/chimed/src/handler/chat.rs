//! Chat API used to answer mentions.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::transport::TransportError;

/// Minimal user profile returned by [`ChatApi::user_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// User identifier.
    pub id: String,
    /// Display name used in replies.
    pub name: String,
}

/// Labelled value rendered beneath an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentField {
    /// Field label.
    pub title: String,
    /// Field content.
    pub value: String,
}

/// Rich message attachment posted as a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Line shown above the attachment.
    pub pretext: String,
    /// Main attachment text.
    pub text: String,
    /// Sidebar colour as a hex string.
    pub color: String,
    /// Additional labelled fields.
    pub fields: Vec<AttachmentField>,
}

/// Errors reported by [`ChatApi`] implementations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The user directory has no entry for the identifier.
    #[error("unknown user {0}")]
    UnknownUser(String),
    /// The remote API rejected the call.
    #[error("chat api rejected the request: {0}")]
    Rejected(String),
    /// The transport failed while carrying the call.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outbound chat operations.
pub trait ChatApi: Send + Sync {
    /// Resolves a user identifier to a profile.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatError`] when the lookup fails.
    fn user_info(&self, user_id: &str) -> Result<UserProfile, ChatError>;

    /// Posts an attachment to a channel.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatError`] when the message cannot be delivered.
    fn post_message(&self, channel: &str, attachment: &Attachment) -> Result<(), ChatError>;
}

impl<T> ChatApi for Arc<T>
where
    T: ChatApi + ?Sized,
{
    fn user_info(&self, user_id: &str) -> Result<UserProfile, ChatError> {
        (**self).user_info(user_id)
    }

    fn post_message(&self, channel: &str, attachment: &Attachment) -> Result<(), ChatError> {
        (**self).post_message(channel, attachment)
    }
}
