//! Registry actor implementation
//!
//! The single owner of the live-session set. Sessions never touch the set
//! directly: every operation is a `RegistryCommand` processed one at a time,
//! which makes name resolution, membership changes and fan-out atomic with
//! respect to each other.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{AppError, SendError};
use crate::message::ServerLine;
use crate::types::{DisplayName, SessionId};

/// The registry's reference to a session
///
/// Holds the sending side of the session's outbound line queue. Cloning
/// it never extends the lifetime of the session's socket.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Session this handle points to
    pub id: SessionId,
    /// Outbound line channel, drained by the session's writer task
    sender: mpsc::Sender<String>,
}

impl SessionHandle {
    pub fn new(id: SessionId, sender: mpsc::Sender<String>) -> Self {
        Self { id, sender }
    }

    /// Queue one line for this session's peer
    ///
    /// Returns an error if the session's writer is gone.
    pub async fn send_line(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender
            .send(line.into())
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

/// A registered session
#[derive(Debug)]
struct Member {
    name: DisplayName,
    handle: SessionHandle,
}

/// Commands sent from sessions to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Insert a session under an already resolved name
    Register {
        handle: SessionHandle,
        name: DisplayName,
    },
    /// Remove a session; acknowledged once removed
    Unregister {
        id: SessionId,
        ack: oneshot::Sender<()>,
    },
    /// Compute a free name without registering
    ResolveName {
        requested: DisplayName,
        reply: oneshot::Sender<DisplayName>,
    },
    /// Resolve a free name and register under it in one step,
    /// sending the rename notice first when the name had to change
    Join {
        handle: SessionHandle,
        requested: DisplayName,
        reply: oneshot::Sender<DisplayName>,
    },
    /// Deliver a line to everyone except `exclude`
    Broadcast {
        line: String,
        exclude: Option<SessionId>,
    },
    /// Number of registered sessions
    Count { reply: oneshot::Sender<usize> },
}

/// The registry actor
///
/// Owns the membership map and processes commands until every handle is dropped.
pub struct Registry {
    /// Registered sessions: SessionId -> Member
    members: HashMap<SessionId, Member>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl Registry {
    /// Create a registry and the handle used to talk to it
    pub fn new(buffer: usize) -> (Self, RegistryHandle) {
        let (sender, receiver) = mpsc::channel(buffer);
        let registry = Self {
            members: HashMap::new(),
            receiver,
        };
        (registry, RegistryHandle { sender })
    }

    /// Spawn the actor on the current runtime and return its handle
    pub fn spawn(buffer: usize) -> RegistryHandle {
        let (registry, handle) = Self::new(buffer);
        tokio::spawn(registry.run());
        handle
    }

    /// Run the registry event loop
    pub async fn run(mut self) {
        info!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Registry shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register { handle, name } => {
                self.register(handle, name);
            }
            RegistryCommand::Unregister { id, ack } => {
                self.unregister(id);
                let _ = ack.send(());
            }
            RegistryCommand::ResolveName { requested, reply } => {
                let _ = reply.send(self.resolve_unique_name(&requested));
            }
            RegistryCommand::Join {
                handle,
                requested,
                reply,
            } => {
                let name = self.resolve_unique_name(&requested);
                // Queued before registering, so no broadcast can precede it.
                if name != requested {
                    let notice = ServerLine::Renamed { name: name.clone() };
                    if handle.send_line(notice.to_string()).await.is_err() {
                        debug!("Session {} gone before its rename notice", handle.id);
                    }
                }
                self.register(handle, name.clone());
                let _ = reply.send(name);
            }
            RegistryCommand::Broadcast { line, exclude } => {
                self.broadcast(&line, exclude).await;
            }
            RegistryCommand::Count { reply } => {
                let _ = reply.send(self.members.len());
            }
        }
    }

    fn register(&mut self, handle: SessionHandle, name: DisplayName) {
        debug!("Registering session {} as '{}'", handle.id, name);
        self.members.insert(handle.id, Member { name, handle });
        debug!("Registered sessions: {}", self.members.len());
    }

    fn unregister(&mut self, id: SessionId) {
        if let Some(member) = self.members.remove(&id) {
            debug!("Unregistered session {} ('{}')", id, member.name);
        }
    }

    /// First of `requested`, `requested1`, `requested2`, ... that no
    /// registered name collides with
    fn resolve_unique_name(&self, requested: &DisplayName) -> DisplayName {
        let mut candidate = requested.clone();
        let mut suffix = 1;
        while self.is_taken(&candidate) {
            candidate = requested.with_suffix(suffix);
            suffix += 1;
        }
        candidate
    }

    fn is_taken(&self, name: &DisplayName) -> bool {
        self.members.values().any(|m| m.name.collides_with(name))
    }

    async fn broadcast(&self, line: &str, exclude: Option<SessionId>) {
        for (id, member) in &self.members {
            if Some(*id) == exclude {
                continue;
            }
            // The recipient's own session discovers the dead connection.
            if let Err(e) = member.handle.send_line(line).await {
                warn!("Failed to deliver to {} ('{}'): {}", id, member.name, e);
            }
        }
    }
}

/// Cloneable handle to the registry actor
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    async fn send(&self, cmd: RegistryCommand) -> Result<(), AppError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| AppError::RegistryClosed)
    }

    /// Insert a session under an already resolved name
    pub async fn register(
        &self,
        handle: SessionHandle,
        name: DisplayName,
    ) -> Result<(), AppError> {
        self.send(RegistryCommand::Register { handle, name }).await
    }

    /// Remove a session if present
    ///
    /// Idempotent. Returns once the removal has been processed, so no
    /// broadcast issued afterwards can reach the session.
    pub async fn unregister(&self, id: SessionId) -> Result<(), AppError> {
        let (ack, done) = oneshot::channel();
        self.send(RegistryCommand::Unregister { id, ack }).await?;
        done.await.map_err(|_| AppError::RegistryClosed)
    }

    /// Find a name not colliding with any registered session
    pub async fn resolve_unique_name(
        &self,
        requested: DisplayName,
    ) -> Result<DisplayName, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::ResolveName { requested, reply }).await?;
        rx.await.map_err(|_| AppError::RegistryClosed)
    }

    /// Resolve a unique name and register under it as one step
    ///
    /// If the name is taken, the rename notice is queued on `handle`
    /// before the session becomes visible to broadcasts.
    pub async fn join(
        &self,
        handle: SessionHandle,
        requested: DisplayName,
    ) -> Result<DisplayName, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Join {
            handle,
            requested,
            reply,
        })
        .await?;
        rx.await.map_err(|_| AppError::RegistryClosed)
    }

    /// Deliver a line to every registered session except `exclude`
    pub async fn broadcast(
        &self,
        line: impl Into<String>,
        exclude: Option<SessionId>,
    ) -> Result<(), AppError> {
        self.send(RegistryCommand::Broadcast {
            line: line.into(),
            exclude,
        })
        .await
    }

    /// Number of registered sessions
    pub async fn len(&self) -> Result<usize, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Count { reply }).await?;
        rx.await.map_err(|_| AppError::RegistryClosed)
    }
}
