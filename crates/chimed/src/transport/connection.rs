//! Stream plumbing for the event source connection.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use chime_config::SocketEndpoint;

use super::TransportError;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Largest envelope accepted from the event source.
pub(super) const MAX_ENVELOPE_BYTES: usize = 64 * 1024;

/// Stream types the transport can dial.
#[derive(Debug)]
pub(super) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    pub(super) fn connect(endpoint: &SocketEndpoint) -> Result<Self, TransportError> {
        let connect_error = |source| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };
        match endpoint {
            SocketEndpoint::Tcp { host, port } => {
                let addrs: Vec<SocketAddr> = (host.as_str(), *port)
                    .to_socket_addrs()
                    .map_err(connect_error)?
                    .collect();
                TcpStream::connect(addrs.as_slice())
                    .map(Self::Tcp)
                    .map_err(connect_error)
            }
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    UnixStream::connect(path.as_std_path())
                        .map(Self::Unix)
                        .map_err(connect_error)
                }

                #[cfg(not(unix))]
                {
                    let _ = path;
                    Err(TransportError::UnsupportedUnix {
                        endpoint: endpoint.to_string(),
                    })
                }
            }
        }
    }

    pub(super) fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    pub(super) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Outcome of a single [`LineReader::next_line`] call.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum LineRead {
    /// A complete line, without its terminator.
    Line(Vec<u8>),
    /// The read timed out before a full line arrived.
    Idle,
    /// The peer closed the stream.
    Eof,
}

/// Splits a byte stream into newline-delimited frames.
///
/// Partial lines survive read timeouts so the caller can poll for shutdown
/// between reads without losing data.
#[derive(Debug, Default)]
pub(super) struct LineReader {
    buffer: Vec<u8>,
    finished: bool,
}

impl LineReader {
    pub(super) fn next_line<R: Read>(&mut self, stream: &mut R) -> io::Result<LineRead> {
        let mut chunk = [0_u8; 1024];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(LineRead::Line(line));
            }
            if self.finished {
                return Ok(self.take_remainder());
            }

            let bytes_read = match stream.read(&mut chunk) {
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(LineRead::Idle);
                }
                Err(error) => return Err(error),
            };

            if bytes_read == 0 {
                self.finished = true;
                continue;
            }

            self.buffer.extend_from_slice(chunk.get(..bytes_read).unwrap_or_default());
            enforce_envelope_limit(self.pending_line_len())?;
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let position = self.buffer.iter().position(|byte| *byte == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=position).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn take_remainder(&mut self) -> LineRead {
        if self.buffer.is_empty() {
            LineRead::Eof
        } else {
            LineRead::Line(std::mem::take(&mut self.buffer))
        }
    }

    fn pending_line_len(&self) -> usize {
        self.buffer
            .iter()
            .position(|byte| *byte == b'\n')
            .unwrap_or(self.buffer.len())
    }
}

fn enforce_envelope_limit(size: usize) -> io::Result<()> {
    if size > MAX_ENVELOPE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "envelope exceeds maximum size",
        ));
    }
    Ok(())
}
