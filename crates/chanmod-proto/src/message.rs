//! Owned IRC messages.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::parser::ParsedLine;
use crate::prefix::Prefix;

/// A parsed IRC line: optional source plus command.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Who sent it.
    pub prefix: Option<Prefix>,
    /// What was sent.
    pub command: Command,
}

impl Message {
    /// Wrap a command with no prefix, as clients send them.
    pub fn from_command(command: Command) -> Self {
        Message {
            prefix: None,
            command,
        }
    }

    /// The sender's nickname, when the source is a user.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::from_command(command)
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })
    }
}

impl Message {
    /// Parse, keeping only the parse error (no copy of the line).
    pub fn parse(s: &str) -> Result<Self, MessageParseError> {
        let parsed = ParsedLine::parse(s)?;
        Ok(Message {
            prefix: parsed.prefix.map(Prefix::parse),
            command: Command::new(parsed.command, parsed.params.to_vec()),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)
    }
}
