//! Server-side session for one accepted connection
//!
//! A session walks Connecting → Negotiating → Active → Closing → Closed.
//! Reading happens on the session's own task; writing is done by a
//! separate writer task that drains the session's outbound queue, so the
//! registry can push broadcasts without touching the socket.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection::{Connection, LineReader, LineWriter, ReadOutcome};
use crate::error::AppError;
use crate::message::{is_exit_keyword, ServerLine};
use crate::registry::{RegistryHandle, SessionHandle};
use crate::types::{DisplayName, SessionId};

/// Lifecycle states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, writer not started yet
    Connecting,
    /// Waiting for the requested display name
    Negotiating,
    /// Registered and relaying messages
    Active,
    /// Deregistering and releasing the connection
    Closing,
    /// Gone
    Closed,
}

/// How the active phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Departure {
    /// Peer sent the exit keyword
    Exit,
    /// Peer closed the stream
    EndOfStream,
    /// Read failed
    TransportError,
}

/// Per-connection server-side participant
pub struct ClientSession<R, W> {
    id: SessionId,
    peer: String,
    state: SessionState,
    name: Option<DisplayName>,
    reader: LineReader<R>,
    /// Writer half and queue receiver, until the writer task takes them
    pending_writer: Option<(LineWriter<W>, mpsc::Receiver<String>)>,
    writer_task: Option<JoinHandle<()>>,
    /// Dropped on close, which ends the writer task
    handle: Option<SessionHandle>,
    registry: RegistryHandle,
    exit_keyword: String,
}

impl<R, W> ClientSession<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a session for an accepted connection
    pub fn new(
        connection: Connection<R, W>,
        registry: RegistryHandle,
        config: &ServerConfig,
        peer: impl Into<String>,
    ) -> Self {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(config.outbound_buffer);
        let (reader, writer) = connection.into_split();

        Self {
            id,
            peer: peer.into(),
            state: SessionState::Connecting,
            name: None,
            reader,
            pending_writer: Some((writer, rx)),
            writer_task: None,
            handle: Some(SessionHandle::new(id, tx)),
            registry,
            exit_keyword: config.exit_keyword.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Assigned name; None until the session is active
    pub fn display_name(&self) -> Option<&DisplayName> {
        self.name.as_ref()
    }

    /// Run this session as an independent task
    pub fn launch(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let id = self.id;
            if let Err(e) = self.run().await {
                error!("Session {} handler error: {}", id, e);
            }
        })
    }

    /// Drive the session to completion
    ///
    /// The connection is always released through Closing, whatever
    /// happened before.
    pub async fn run(mut self) -> Result<(), AppError> {
        self.start_writer();
        let result = self.converse().await;
        self.close().await;
        result
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    fn start_writer(&mut self) {
        if let Some((writer, outbound)) = self.pending_writer.take() {
            self.writer_task = Some(tokio::spawn(write_loop(self.id, writer, outbound)));
        }
    }

    /// Queue a line for our own peer
    async fn send_line(&mut self, line: ServerLine) {
        let Some(handle) = &self.handle else {
            return;
        };
        if handle.send_line(line.to_string()).await.is_err() {
            debug!("Session {} writer gone, dropping line", self.id);
        }
    }

    async fn converse(&mut self) -> Result<(), AppError> {
        self.transition(SessionState::Negotiating);
        let Some(requested) = self.read_requested_name().await else {
            return Ok(());
        };

        let name = self.activate(requested).await?;
        let departure = self.relay(&name).await?;

        debug!("Session {} ('{}') departing: {:?}", self.id, name, departure);
        self.registry
            .broadcast(ServerLine::Left { name }.to_string(), Some(self.id))
            .await
    }

    /// Read the first line as a display name
    ///
    /// None means the peer vanished before introducing itself.
    async fn read_requested_name(&mut self) -> Option<DisplayName> {
        match self.reader.read_line().await {
            ReadOutcome::Line(line) => {
                let name = DisplayName::parse(&line);
                if name.is_none() {
                    debug!("Session {} from {} sent an empty name", self.id, self.peer);
                }
                name
            }
            ReadOutcome::EndOfStream => {
                debug!("Session {} from {} closed before naming itself", self.id, self.peer);
                None
            }
            ReadOutcome::TransportError(e) => {
                warn!("Session {} from {} failed during negotiation: {}", self.id, self.peer, e);
                None
            }
        }
    }

    /// Negotiating → Active
    async fn activate(&mut self, requested: DisplayName) -> Result<DisplayName, AppError> {
        let Some(handle) = self.handle.clone() else {
            return Err(AppError::RegistryClosed);
        };

        // The registry queues the rename notice itself when needed.
        let name = self.registry.join(handle, requested).await?;
        self.name = Some(name.clone());
        self.transition(SessionState::Active);

        info!("New user connected: {} (session {}, {})", name, self.id, self.peer);
        self.registry
            .broadcast(ServerLine::Joined { name: name.clone() }.to_string(), Some(self.id))
            .await?;
        self.send_line(ServerLine::Welcome { name: name.clone() }).await;

        Ok(name)
    }

    /// The Active loop; returns once the peer is leaving
    async fn relay(&mut self, name: &DisplayName) -> Result<Departure, AppError> {
        loop {
            match self.reader.read_line().await {
                ReadOutcome::Line(line) if is_exit_keyword(&line, &self.exit_keyword) => {
                    self.send_line(ServerLine::Disconnected).await;
                    return Ok(Departure::Exit);
                }
                ReadOutcome::Line(content) => {
                    let chat = ServerLine::Chat {
                        from: name.clone(),
                        content,
                    };
                    self.registry.broadcast(chat.to_string(), Some(self.id)).await?;
                }
                ReadOutcome::EndOfStream => return Ok(Departure::EndOfStream),
                ReadOutcome::TransportError(e) => {
                    warn!("Communication error with {} (session {}): {}", name, self.id, e);
                    return Ok(Departure::TransportError);
                }
            }
        }
    }

    /// Closing → Closed
    ///
    /// Unregisters before the connection is torn down so no broadcast can
    /// race with a closed socket.
    async fn close(mut self) {
        self.transition(SessionState::Closing);

        if let Err(e) = self.registry.unregister(self.id).await {
            warn!("Session {} could not unregister: {}", self.id, e);
        }

        let Self {
            id,
            name,
            reader,
            pending_writer,
            writer_task,
            handle,
            ..
        } = self;

        // Last sender gone: the writer flushes what is queued and shuts down.
        drop(handle);
        drop(pending_writer);
        if let Some(task) = writer_task {
            let _ = task.await;
        }
        drop(reader);

        if let Some(name) = name {
            info!("{} has disconnected (session {})", name, id);
        }
        debug!("Session {}: Closing -> {:?}", id, SessionState::Closed);
    }
}

/// Drain the outbound queue into the connection's write half
async fn write_loop<W>(
    id: SessionId,
    mut writer: LineWriter<W>,
    mut outbound: mpsc::Receiver<String>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbound.recv().await {
        if let Err(e) = writer.write_line(&line).await {
            debug!("Write to session {} failed: {}", id, e);
            break;
        }
    }

    let _ = writer.close().await;
    debug!("Write task ended for {}", id);
}
