//! Chat Relay Server - Entry Point
//!
//! Binds the listener, starts the registry actor and accepts connections.

use std::env;

use tracing_subscriber::EnvFilter;

use chat_relay::{ChatServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Get bind address from command line or use default
    let config = match env::args().nth(1) {
        Some(addr) => ServerConfig::with_bind_addr(addr),
        None => ServerConfig::default(),
    };

    let server = ChatServer::bind(config).await?;
    server.run().await;

    Ok(())
}
