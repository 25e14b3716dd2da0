//! Runtime configuration
//!
//! Server and client settings with sensible defaults. The binaries only
//! override the address; everything else stays at its default.

/// Default TCP port for both server and client
pub const DEFAULT_PORT: u16 = 1234;

/// Default server bind address (all interfaces)
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";

/// Default address the client connects to
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:1234";

/// Keyword a client sends to leave the conversation (case-insensitive)
pub const EXIT_KEYWORD: &str = "exit";

/// Longest accepted line in bytes, excluding the terminator
pub const MAX_LINE_LENGTH: usize = 8192;

/// Channel buffer size for registry commands
pub const REGISTRY_BUFFER_SIZE: usize = 256;

/// Channel buffer size for each session's outbound lines
pub const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Server-side settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Keyword that ends a session gracefully
    pub exit_keyword: String,
    /// Longest accepted line from a peer
    pub max_line_length: usize,
    /// Registry command queue capacity
    pub registry_buffer: usize,
    /// Per-session outbound queue capacity
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            exit_keyword: EXIT_KEYWORD.to_string(),
            max_line_length: MAX_LINE_LENGTH,
            registry_buffer: REGISTRY_BUFFER_SIZE,
            outbound_buffer: OUTBOUND_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Default config bound to the given address
    pub fn with_bind_addr(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }
}

/// Client-side settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to
    pub server_addr: String,
    /// Keyword sent to the server when the user quits
    pub exit_keyword: String,
    /// Longest accepted line from the server or local input
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            exit_keyword: EXIT_KEYWORD.to_string(),
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Default config targeting the given server address
    pub fn with_server_addr(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            ..Self::default()
        }
    }
}
