//! Line protocol definitions
//!
//! Every server → client message is a single line of text. `ServerLine`
//! enumerates them and renders the exact wire wording through `Display`.

use std::fmt;

use crate::types::DisplayName;

/// Server → Client line
///
/// The first two go only to the joining client, the disconnect
/// acknowledgement only to the departing one, the rest are broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// Requested name was taken, the session got a suffixed one
    Renamed { name: DisplayName },
    /// Greeting once the session is active
    Welcome { name: DisplayName },
    /// Someone joined
    Joined { name: DisplayName },
    /// Chat message relayed from another session
    Chat { from: DisplayName, content: String },
    /// Someone left, gracefully or not
    Left { name: DisplayName },
    /// Acknowledgement of the exit keyword
    Disconnected,
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerLine::Renamed { name } => {
                write!(f, "Pseudonym already taken, you have been renamed to {}", name)
            }
            ServerLine::Welcome { name } => write!(f, "Welcome to the chat, {}!", name),
            ServerLine::Joined { name } => write!(f, "{} has joined the conversation.", name),
            ServerLine::Chat { from, content } => write!(f, "{}: {}", from, content),
            ServerLine::Left { name } => write!(f, "{} has left the conversation.", name),
            ServerLine::Disconnected => write!(f, "You have been disconnected from the server."),
        }
    }
}

/// Check whether a line is exactly the exit keyword, ignoring case
///
/// Surrounding whitespace makes it an ordinary chat line.
pub fn is_exit_keyword(line: &str, keyword: &str) -> bool {
    line.eq_ignore_ascii_case(keyword)
}
