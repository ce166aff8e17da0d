use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use mailhook_common::{
    Signal,
    error::SessionError,
    incoming, internal, outgoing,
    traits::{EnvelopeHandler, FiniteStateMachine},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream},
    sync::broadcast,
};
use tracing::warn;

use crate::{
    SmtpConfig,
    command::Command,
    envelope,
    state::{Context, State},
    status::{Reply, Status},
};

/// Longest line read in one go, CRLF included
const MAX_LINE_LENGTH: u64 = 1000;

/// Per-session settings, shared by every connection of a listener
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub banner: Arc<str>,
    pub max_message_size: usize,
    /// `None` lets clients idle indefinitely
    pub command_timeout: Option<Duration>,
}

impl From<&SmtpConfig> for SessionConfig {
    fn from(config: &SmtpConfig) -> Self {
        Self {
            banner: config.banner(),
            max_message_size: config.max_message_size,
            command_timeout: config.command_timeout(),
        }
    }
}

pub struct Session<Stream: AsyncRead + AsyncWrite + Unpin + Send> {
    peer: SocketAddr,
    stream: BufStream<Stream>,
    state: State,
    context: Context,
    handler: Arc<dyn EnvelopeHandler>,
    command_timeout: Option<Duration>,
}

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send> Session<Stream> {
    pub fn create(
        stream: Stream,
        peer: SocketAddr,
        config: SessionConfig,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Self {
        Self {
            peer,
            stream: BufStream::new(stream),
            state: State::default(),
            context: Context::new(config.banner, config.max_message_size),
            handler,
            command_timeout: config.command_timeout,
        }
    }

    /// Drive the dialogue until the client quits, the connection drops, or
    /// a shutdown is signalled.
    ///
    /// # Errors
    /// On I/O failures, timeouts, and shutdown.
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> Result<(), SessionError> {
        internal!("Connected to {}", self.peer);

        let greeting = Reply::new(
            Status::ServiceReady,
            format!("{} ESMTP mailhook", self.context.banner),
        );

        let mut result = self.send(&greeting).await;
        if result.is_ok() {
            result = self.serve(&mut shutdown).await;
        }

        if let Err(SessionError::Timeout(secs)) = &result {
            warn!(peer = %self.peer, state = %self.state, timeout_secs = secs, "Client connection timed out");
            let _ = self
                .send(&Reply::new(
                    Status::Unavailable,
                    "Timeout exceeded, closing connection",
                ))
                .await;
        }

        internal!("Connection to {} closed", self.peer);
        result
    }

    async fn serve(
        &mut self,
        shutdown: &mut broadcast::Receiver<Signal>,
    ) -> Result<(), SessionError> {
        let mut line = Vec::new();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    self.send(&Reply::new(Status::Unavailable, "Server shutting down")).await?;
                    return Err(SessionError::Shutdown);
                }

                read = self.read_timed(&mut line) => {
                    let read = read?;

                    // The other side is done writing, so are we.
                    if read == 0 {
                        return Ok(());
                    }
                }
            }

            if is_truncated(&line) {
                self.discard_line().await?;
                self.send(&Reply::new(Status::SyntaxError, "Line too long"))
                    .await?;
                continue;
            }

            if !self.handle_command(&line).await? {
                return Ok(());
            }
        }
    }

    /// Returns `false` once the session should end.
    async fn handle_command(&mut self, line: &[u8]) -> Result<bool, SessionError> {
        let command = Command::from(line);
        incoming!("{command}");

        self.state = self.state.transition(command, &mut self.context);
        tracing::debug!("Transitioned to {}", self.state);

        if let Some(reply) = self.context.reply.take() {
            self.send(&reply).await?;
        }

        match self.state {
            State::Quit => Ok(false),
            State::Reading => {
                self.receive_message().await?;
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn receive_message(&mut self) -> Result<(), SessionError> {
        let reply = match self.read_data().await? {
            None => Reply::new(
                Status::ExceededStorage,
                format!(
                    "Message exceeds fixed maximum message size of {} bytes",
                    self.context.max_message_size
                ),
            ),
            Some(data) => {
                let envelope = envelope::assemble(
                    self.context.sender.take().unwrap_or_default(),
                    std::mem::take(&mut self.context.recipients),
                    &data,
                    self.peer.ip(),
                );

                match self.handler.handle(envelope).await {
                    Ok(()) => {
                        internal!(
                            level = DEBUG,
                            "Queued message from {} ({})",
                            self.context.id,
                            self.peer
                        );
                        Reply::new(Status::Ok, "Ok: queued")
                    }
                    Err(err) => {
                        internal!(level = WARN, "Unable to hand over message: {err}");
                        Reply::new(
                            Status::ActionUnavailable,
                            "Requested action aborted: local error in processing",
                        )
                    }
                }
            }
        };

        self.context.reset();
        self.state = State::Ready;
        self.send(&reply).await
    }

    /// Read the message content up to the terminating `.` line, undoing dot
    /// stuffing.
    ///
    /// Returns `None` when the content exceeded the size limit; the rest of
    /// it is still consumed.
    async fn read_data(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let limit = self.context.max_message_size;
        let mut message = Vec::new();
        let mut line = Vec::new();
        let mut line_start = true;
        let mut oversized = false;

        loop {
            let read = self.read_timed(&mut line).await?;

            if read == 0 {
                return Err(SessionError::Disconnected("DATA"));
            }

            if line_start && matches!(line.as_slice(), b".\r\n" | b".\n") {
                break;
            }

            let content = if line_start && line.first() == Some(&b'.') {
                &line[1..]
            } else {
                &line[..]
            };
            line_start = line.ends_with(b"\n");

            if oversized {
                continue;
            }

            if limit > 0 && message.len().saturating_add(content.len()) > limit {
                internal!(
                    level = WARN,
                    "Message from {} exceeds {limit} bytes, rejecting",
                    self.peer
                );
                oversized = true;
                message = Vec::new();
            } else {
                message.extend_from_slice(content);
            }
        }

        Ok((!oversized).then_some(message))
    }

    /// Read one line, bounded by the command timeout when there is one.
    async fn read_timed(&mut self, line: &mut Vec<u8>) -> Result<usize, SessionError> {
        let read = read_line(&mut self.stream, line);

        let read = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| SessionError::Timeout(limit.as_secs()))?,
            None => read.await,
        };

        Ok(read?)
    }

    async fn discard_line(&mut self) -> Result<(), SessionError> {
        let mut line = Vec::new();

        loop {
            let read = self.read_timed(&mut line).await?;

            if read == 0 || !is_truncated(&line) {
                return Ok(());
            }
        }
    }

    async fn send(&mut self, reply: &Reply) -> Result<(), SessionError> {
        outgoing!("{reply}");

        self.stream
            .write_all(format!("{reply}\r\n").as_bytes())
            .await?;
        self.stream.flush().await?;

        Ok(())
    }
}

async fn read_line<Stream: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufStream<Stream>,
    line: &mut Vec<u8>,
) -> io::Result<usize> {
    line.clear();
    stream.take(MAX_LINE_LENGTH).read_until(b'\n', line).await
}

/// A full-length read without a line break means the line went on.
fn is_truncated(line: &[u8]) -> bool {
    !line.ends_with(b"\n") && line.len() as u64 >= MAX_LINE_LENGTH
}
