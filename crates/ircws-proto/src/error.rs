//! Error types for framing and message parsing.
//!
//! Nothing here is fatal to a connection: a line that fails to parse is
//! logged and dropped by the caller, and framing never fails at all.

use thiserror::Error;

/// Convenience alias for results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A line did not match the IRC message grammar.
    #[error("invalid message {string:?}: {cause}")]
    InvalidMessage {
        /// The offending line, without its terminator.
        string: String,
        /// Why it was rejected.
        cause: MessageParseError,
    },

    /// A line exceeded the configured maximum length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Length of the line seen so far.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },
}

/// Reasons a single line is rejected by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// The line was empty or only whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// A `:` prefix was present but had no sender.
    #[error("empty prefix")]
    EmptyPrefix,

    /// The command was neither a keyword nor a three digit numeric.
    #[error("invalid command at byte {position}")]
    InvalidCommand {
        /// Byte offset of the rejected token.
        position: usize,
    },
}
