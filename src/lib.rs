//! Line-Oriented TCP Chat Relay Library
//!
//! A multi-client chat server and console client built on tokio. Every
//! message is one newline-terminated line of text.
//!
//! # Features
//! - Display name negotiation with automatic suffixing on collisions
//! - Join / leave announcements
//! - Relay of chat lines to every other connected client
//! - Graceful exit keyword and abrupt disconnect handling
//! - Console client with independent send and receive loops
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Registry` is the actor owning the set of live sessions
//! - Each connection runs a `ClientSession` task plus a writer task
//! - No locks needed - membership changes and broadcasts are serialized
//!   through the registry's command queue
//!
//! # Example
//! ```ignore
//! use chat_relay::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind(ServerConfig::with_bind_addr("127.0.0.1:1234"))
//!         .await
//!         .unwrap();
//!     server.run().await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::{receive_loop, send_loop, ChatClient};
pub use config::{ClientConfig, ServerConfig};
pub use connection::{Connection, LineReader, LineWriter, ReadOutcome};
pub use error::{AppError, SendError};
pub use message::ServerLine;
pub use registry::{Registry, RegistryCommand, RegistryHandle, SessionHandle};
pub use server::ChatServer;
pub use session::{ClientSession, SessionState};
pub use types::{DisplayName, SessionId};
