//! Chat server accept loop
//!
//! Binds the listener, starts the registry actor and launches one
//! `ClientSession` task per accepted connection.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::AppError;
use crate::registry::{Registry, RegistryHandle};
use crate::session::ClientSession;

/// A bound chat server, ready to accept connections
pub struct ChatServer {
    listener: TcpListener,
    registry: RegistryHandle,
    config: ServerConfig,
}

impl ChatServer {
    /// Bind the listening socket and start the registry actor
    pub async fn bind(config: ServerConfig) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let registry = Registry::spawn(config.registry_buffer);
        info!("Chat server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            registry,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the shared registry
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Accept connections forever
    ///
    /// A failed accept is logged and does not stop the loop.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let connection = Connection::from_tcp(stream, self.config.max_line_length);
                    let session = ClientSession::new(
                        connection,
                        self.registry.clone(),
                        &self.config,
                        addr.to_string(),
                    );
                    session.launch();
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    use crate::connection::{LineReader, LineWriter, ReadOutcome};
    use crate::types::DisplayName;

    const WAIT: Duration = Duration::from_secs(5);

    struct TestClient {
        reader: LineReader<OwnedReadHalf>,
        writer: LineWriter<OwnedWriteHalf>,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (reader, writer) = Connection::from_tcp(stream, 4096).into_split();
            Self { reader, writer }
        }

        /// Connect, send a name and consume the negotiation lines
        async fn join(addr: SocketAddr, name: &str) -> (Self, Vec<String>) {
            let mut client = Self::connect(addr).await;
            client.send(name).await;
            let mut lines = Vec::new();
            loop {
                let line = client.expect_line().await;
                let done = line.starts_with("Welcome to the chat, ");
                lines.push(line);
                if done {
                    return (client, lines);
                }
            }
        }

        async fn send(&mut self, line: &str) {
            self.writer.write_line(line).await.unwrap();
        }

        async fn expect_line(&mut self) -> String {
            match timeout(WAIT, self.reader.read_line()).await.unwrap() {
                ReadOutcome::Line(line) => line,
                other => panic!("expected a line, got {:?}", other),
            }
        }

        async fn expect_closed(&mut self) {
            let outcome = timeout(WAIT, self.reader.read_line()).await.unwrap();
            assert!(matches!(outcome, ReadOutcome::EndOfStream));
        }
    }

    async fn start() -> (SocketAddr, RegistryHandle) {
        let server = ChatServer::bind(ServerConfig::with_bind_addr("127.0.0.1:0"))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        tokio::spawn(server.run());
        (addr, registry)
    }

    #[tokio::test]
    async fn test_second_alice_is_renamed() {
        let (addr, _registry) = start().await;

        let (mut alice, lines) = TestClient::join(addr, "Alice").await;
        assert_eq!(lines, vec!["Welcome to the chat, Alice!"]);

        let (_bob, lines) = TestClient::join(addr, "Alice").await;
        assert_eq!(
            lines,
            vec![
                "Pseudonym already taken, you have been renamed to Alice1",
                "Welcome to the chat, Alice1!",
            ]
        );

        assert_eq!(alice.expect_line().await, "Alice1 has joined the conversation.");
    }

    #[tokio::test]
    async fn test_messages_reach_others_without_echo() {
        let (addr, _registry) = start().await;
        let (mut alice, _) = TestClient::join(addr, "Alice").await;
        let (mut bob, _) = TestClient::join(addr, "Bob").await;
        assert_eq!(alice.expect_line().await, "Bob has joined the conversation.");

        alice.send("hello").await;
        assert_eq!(bob.expect_line().await, "Alice: hello");

        bob.send("hi").await;
        assert_eq!(alice.expect_line().await, "Bob: hi");

        // Bob's next line is Alice's, not an echo of "Bob: hi".
        alice.send("again").await;
        assert_eq!(bob.expect_line().await, "Alice: again");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_other_client_once() {
        let (addr, _registry) = start().await;
        let (mut sender, _) = TestClient::join(addr, "Sender").await;
        let mut others = Vec::new();
        for name in ["A", "B", "C"] {
            let (client, _) = TestClient::join(addr, name).await;
            others.push(client);
        }

        // Drain join notices so only the relayed message is left to read.
        for _ in 0..3 {
            assert!(sender.expect_line().await.ends_with("has joined the conversation."));
        }
        for (i, client) in others.iter_mut().enumerate() {
            for _ in i + 1..3 {
                assert!(client.expect_line().await.ends_with("has joined the conversation."));
            }
        }

        sender.send("ping").await;
        for client in &mut others {
            assert_eq!(client.expect_line().await, "Sender: ping");
        }

        others[0].send("pong").await;
        assert_eq!(sender.expect_line().await, "A: pong");
        assert_eq!(others[1].expect_line().await, "A: pong");
        assert_eq!(others[2].expect_line().await, "A: pong");
    }

    #[tokio::test]
    async fn test_exit_then_name_is_free_again() {
        let (addr, registry) = start().await;
        let (mut alice, _) = TestClient::join(addr, "Alice").await;
        let (mut bob, _) = TestClient::join(addr, "Bob").await;
        alice.expect_line().await;

        alice.send("exit").await;
        assert_eq!(
            alice.expect_line().await,
            "You have been disconnected from the server."
        );
        assert_eq!(bob.expect_line().await, "Alice has left the conversation.");
        alice.expect_closed().await;

        let name = registry
            .resolve_unique_name(DisplayName::parse("Alice").unwrap())
            .await
            .unwrap();
        assert_eq!(name.as_str(), "Alice");
        assert_eq!(registry.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_severed_client_gets_same_leave_notice() {
        let (addr, registry) = start().await;
        let (mut alice, _) = TestClient::join(addr, "Alice").await;
        let (mut bob, _) = TestClient::join(addr, "Bob").await;
        alice.expect_line().await;

        drop(alice);
        assert_eq!(bob.expect_line().await, "Alice has left the conversation.");

        let mut remaining = registry.len().await.unwrap();
        for _ in 0..50 {
            if remaining == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            remaining = registry.len().await.unwrap();
        }
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn test_silent_disconnect_is_not_registered() {
        let (addr, registry) = start().await;
        let (mut alice, _) = TestClient::join(addr, "Alice").await;

        let ghost = TestClient::connect(addr).await;
        drop(ghost);

        let (_bob, _) = TestClient::join(addr, "Bob").await;
        assert_eq!(alice.expect_line().await, "Bob has joined the conversation.");
        assert_eq!(registry.len().await.unwrap(), 2);
    }
}
