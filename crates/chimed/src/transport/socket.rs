//! Newline-delimited JSON transport over a TCP or Unix stream.

use std::io::Write;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chime_config::SocketEndpoint;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::connection::{ConnectionStream, LineRead, LineReader};
use super::envelope::{AckFrame, OutboundFrame, decode_envelope, encode_line};
use super::{Acknowledger, EventTransport, TRANSPORT_TARGET, TransportError};
use crate::consumer::ShutdownToken;
use crate::event::{Event, Request};
use crate::handler::{Attachment, ChatApi, ChatError, UserProfile};

/// Read timeout applied to the inbound stream so `run` can observe shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Decoded events buffered between the delivery loop and the reader.
const EVENT_BUFFER: usize = 64;
/// Pause between delivery attempts while the buffer is full.
const DELIVERY_BACKOFF: Duration = Duration::from_millis(25);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write half shared by acknowledgements and chat calls.
#[derive(Debug)]
struct FrameWriter {
    stream: Mutex<ConnectionStream>,
}

impl FrameWriter {
    fn send<T: Serialize>(&self, frame: &'static str, payload: &T) -> Result<(), TransportError> {
        let line =
            encode_line(payload).map_err(|source| TransportError::Encode { frame, source })?;
        let mut stream = lock(&self.stream);
        stream
            .write_all(&line)
            .and_then(|()| stream.flush())
            .map_err(|source| TransportError::Write { frame, source })?;
        debug!(target: TRANSPORT_TARGET, frame, bytes = line.len(), "frame written");
        Ok(())
    }
}

/// Event source connection.
///
/// [`run`](EventTransport::run) owns the read half and decodes one envelope
/// per line; [`next_event`](EventTransport::next_event) hands the decoded
/// events to the consumer's reader. Acknowledgements and chat frames share the
/// write half.
#[derive(Debug)]
pub struct SocketTransport {
    endpoint: String,
    reader: Mutex<Option<ConnectionStream>>,
    writer: Arc<FrameWriter>,
    sender: Mutex<Option<SyncSender<Event>>>,
    receiver: Mutex<Receiver<Event>>,
}

impl SocketTransport {
    /// Connects to `endpoint`, authenticating first when `app_token` is set.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the connection cannot be established,
    /// configured, or the authentication frame cannot be written.
    pub fn connect(
        endpoint: &SocketEndpoint,
        app_token: Option<&str>,
    ) -> Result<Self, TransportError> {
        let stream = ConnectionStream::connect(endpoint)?;
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|source| TransportError::Configure { source })?;
        let write_half = stream
            .try_clone()
            .map_err(|source| TransportError::Configure { source })?;

        let (sender, receiver) = mpsc::sync_channel(EVENT_BUFFER);
        let transport = Self {
            endpoint: endpoint.to_string(),
            reader: Mutex::new(Some(stream)),
            writer: Arc::new(FrameWriter {
                stream: Mutex::new(write_half),
            }),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
        };

        if let Some(token) = app_token {
            let frame = OutboundFrame::Auth { token };
            transport.writer.send(frame.name(), &frame)?;
        }
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %transport.endpoint,
            authenticated = app_token.is_some(),
            "connected to event source"
        );
        Ok(transport)
    }

    /// Returns a chat client that writes through this connection.
    #[must_use]
    pub fn chat_api(&self) -> SocketChatApi {
        SocketChatApi {
            writer: Arc::clone(&self.writer),
        }
    }

    /// Hands `event` to the reader, waiting while the buffer is full.
    ///
    /// Returns `false` when delivery should stop.
    fn deliver(&self, sender: &SyncSender<Event>, event: Event, shutdown: &ShutdownToken) -> bool {
        let mut pending = event;
        loop {
            match sender.try_send(pending) {
                Ok(()) => return true,
                Err(TrySendError::Full(returned)) => {
                    if shutdown.wait_timeout(DELIVERY_BACKOFF) {
                        return false;
                    }
                    pending = returned;
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!(
                        target: TRANSPORT_TARGET,
                        endpoint = %self.endpoint,
                        "event receiver dropped"
                    );
                    return false;
                }
            }
        }
    }
}

impl EventTransport for SocketTransport {
    fn run(&self, shutdown: &ShutdownToken) {
        let Some(mut stream) = lock(&self.reader).take() else {
            warn!(target: TRANSPORT_TARGET, "delivery loop already ran; ignoring");
            return;
        };
        let Some(sender) = lock(&self.sender).take() else {
            return;
        };

        let mut lines = LineReader::default();
        while !shutdown.is_cancelled() {
            match lines.next_line(&mut stream) {
                Ok(LineRead::Line(line)) => {
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    match decode_envelope(&line) {
                        Ok(event) => {
                            if !self.deliver(&sender, event, shutdown) {
                                break;
                            }
                        }
                        Err(decode_error) => warn!(
                            target: TRANSPORT_TARGET,
                            error = %decode_error,
                            "discarding malformed envelope"
                        ),
                    }
                }
                Ok(LineRead::Idle) => {}
                Ok(LineRead::Eof) => {
                    info!(
                        target: TRANSPORT_TARGET,
                        endpoint = %self.endpoint,
                        "event source closed the connection"
                    );
                    break;
                }
                Err(read_error) => {
                    error!(
                        target: TRANSPORT_TARGET,
                        endpoint = %self.endpoint,
                        error = %read_error,
                        "reading from event source failed"
                    );
                    break;
                }
            }
        }
        debug!(target: TRANSPORT_TARGET, "delivery loop finished");
    }

    fn next_event(&self, timeout: Duration) -> Result<Option<Event>, TransportError> {
        match lock(&self.receiver).recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

impl Acknowledger for SocketTransport {
    fn ack(&self, request: &Request) -> Result<(), TransportError> {
        self.writer.send(
            "ack",
            &AckFrame {
                envelope_id: &request.envelope_id,
            },
        )
    }
}

/// [`ChatApi`] that writes chat frames over the event source connection.
///
/// The connection carries no user directory, so lookups echo the identifier
/// back as the display name.
#[derive(Debug, Clone)]
pub struct SocketChatApi {
    writer: Arc<FrameWriter>,
}

impl ChatApi for SocketChatApi {
    fn user_info(&self, user_id: &str) -> Result<UserProfile, ChatError> {
        if user_id.is_empty() {
            return Err(ChatError::UnknownUser(String::new()));
        }
        Ok(UserProfile {
            id: user_id.to_owned(),
            name: user_id.to_owned(),
        })
    }

    fn post_message(&self, channel: &str, attachment: &Attachment) -> Result<(), ChatError> {
        if channel.is_empty() {
            return Err(ChatError::Rejected(String::from("channel_not_found")));
        }
        let frame = OutboundFrame::PostMessage {
            channel,
            attachments: [attachment],
        };
        self.writer.send(frame.name(), &frame)?;
        Ok(())
    }
}
