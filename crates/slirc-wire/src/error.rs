//! Error types for the wire codec.

use nom::error::ErrorKind;
use thiserror::Error;

/// Why an incoming line was rejected.
///
/// A rejected line is dropped as a whole: no partial command is ever
/// produced from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The line was empty (or only a line terminator).
    #[error("empty line")]
    EmptyLine,

    /// The tag section exceeded the permitted length.
    #[error("tag section too long: {length} > {limit}")]
    TagsTooLong {
        /// Length of the received tag section.
        length: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The body (everything after the tag section) exceeded the line limit.
    #[error("line too long: {length} > {limit}")]
    LineTooLong {
        /// Length of the received body.
        length: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The line did not match the IRC grammar.
    #[error("malformed line at byte {position}: {kind:?}")]
    Malformed {
        /// Byte offset where parsing stopped.
        position: usize,
        /// The nom error kind.
        kind: ErrorKind,
    },
}

impl ParseError {
    /// Static label used for logging and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyLine => "empty_line",
            Self::TagsTooLong { .. } => "tags_too_long",
            Self::LineTooLong { .. } => "line_too_long",
            Self::Malformed { .. } => "malformed",
        }
    }
}
