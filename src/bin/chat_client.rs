//! Chat Relay Client - Entry Point
//!
//! Connects to the server and runs the send/receive pair on the console.

use std::env;
use std::process;

use tracing::error;
use tracing_subscriber::EnvFilter;

use chat_relay::{ChatClient, ClientConfig};

/// Library and binary targets both log at info unless RUST_LOG says otherwise
const DEFAULT_LOG_FILTER: &str = "chat_relay=info,chat_client=info";

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout is the chat transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match env::args().nth(1) {
        Some(addr) => ClientConfig::with_server_addr(addr),
        None => ClientConfig::default(),
    };

    let code = match ChatClient::new(config).run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("Chat client error: {}", e);
            1
        }
    };

    // Exit explicitly: the send loop may still be blocked on stdin.
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_this_binary() {
        let own_target = format!("{}=", env!("CARGO_CRATE_NAME"));
        assert!(DEFAULT_LOG_FILTER.split(',').any(|d| d.starts_with(&own_target)));
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
