//! Error types for the protocol crate.

use thiserror::Error;

/// Convenience alias for results carrying a [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while reading or writing the wire.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the negotiated limit.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Length of the offending line.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The line was not valid UTF-8.
    #[error("invalid UTF-8 at byte {valid_up_to}")]
    InvalidUtf8 {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },

    /// An outgoing command would have smuggled a line break or NUL.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// A line could not be parsed into a message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw line.
        string: String,
        /// Why it was rejected.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered while parsing a single line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty or only whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// No command could be found, or it was neither letters nor three digits.
    #[error("invalid command at position {position}")]
    InvalidCommand {
        /// Byte offset where parsing stopped.
        position: usize,
    },

    /// A command was missing required parameters.
    #[error("not enough arguments for {command}: expected {expected}, got {got}")]
    NotEnoughArguments {
        /// Command name.
        command: String,
        /// Minimum parameter count.
        expected: usize,
        /// Parameters actually present.
        got: usize,
    },

    /// A mode string could not be paired with its arguments.
    #[error("invalid mode string: {0}")]
    InvalidModeString(String),
}
