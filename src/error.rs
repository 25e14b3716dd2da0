//! Error types for the chat relay
//!
//! Defines application-level errors and outbound line send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// None of these are ever shown to a chat peer. Peers only see the
/// standard leave and disconnect notices; details go to the log.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (bind, accept, connect, stdout)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (oversized line or IO failure inside the codec)
    #[error("Line codec error: {0}")]
    Lines(#[from] LinesCodecError),

    /// The registry actor is no longer running
    #[error("Registry closed")]
    RegistryClosed,
}

/// Outbound line send errors
///
/// Occurs when pushing a line to a session whose writer has gone away.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the session's outbound queue has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
