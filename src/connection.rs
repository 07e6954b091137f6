//! The transport seam between the scheduler and an IRC session.
//!
//! The scheduler never touches sockets. It issues commands, reads the
//! channel roster and prints user-facing lines through [`Connection`]; the
//! runtime client implements it over a live session and tests implement it
//! with a recorder.

use chanmod_proto::Command;
use std::fmt;

/// A channel member as seen in NAMES and subsequent updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub nick: String,
    /// Membership prefixes currently held (`@`, `%`, `+`, ...).
    pub prefix: String,
}

impl Member {
    pub fn new(nick: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            prefix: prefix.into(),
        }
    }

    pub fn is_op(&self) -> bool {
        self.prefix.contains('@')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    /// Shown the way a client shows server errors.
    Error,
    /// Plain informational text.
    Text,
}

/// A line for the user, not for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub kind: DisplayKind,
    pub text: String,
}

impl DisplayLine {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: DisplayKind::Error,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: DisplayKind::Text,
            text: text.into(),
        }
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DisplayKind::Error => write!(f, "!! {}", self.text),
            DisplayKind::Text => write!(f, "-- {}", self.text),
        }
    }
}

/// What the scheduler needs from a session.
pub trait Connection {
    /// Queue a command for the server. Fire-and-forget.
    fn send(&mut self, command: Command);

    /// Our current nickname.
    fn nick(&self) -> &str;

    /// Current members of `channel`, empty if unknown.
    fn members(&self, channel: &str) -> Vec<Member>;

    /// Show a line to the user.
    fn display(&mut self, line: DisplayLine);
}
