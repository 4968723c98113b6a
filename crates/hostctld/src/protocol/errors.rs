//! Channel errors and their classification.
//!
//! A syntax error means framing can no longer be trusted, so it is fatal and
//! the channel stops reading. A semantic error concerns one well-framed unit
//! and leaves the channel open.

use thiserror::Error;

use super::ReplyShape;

/// Broad class of a channel error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input could not be framed or parsed as JSON.
    Syntax,
    /// Input parsed but did not describe valid actions.
    Semantic,
}

/// Failure attributed to one input unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ChannelError {
    kind: ErrorKind,
    message: String,
    location: Option<(usize, usize)>,
    shape: ReplyShape,
}

impl ChannelError {
    /// A fatal syntax error rendered in `shape`.
    #[must_use]
    pub fn syntax(message: impl Into<String>, shape: ReplyShape) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            location: None,
            shape,
        }
    }

    /// A recoverable semantic error rendered in `shape`.
    #[must_use]
    pub fn semantic(message: impl Into<String>, shape: ReplyShape) -> Self {
        Self {
            kind: ErrorKind::Semantic,
            message: message.into(),
            location: None,
            shape,
        }
    }

    /// Attaches the one-based input line and column.
    #[must_use]
    pub const fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some((line, column));
        self
    }

    /// Error class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the channel must stop reading after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Syntax)
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-based line and column of a syntax error.
    #[must_use]
    pub const fn location(&self) -> Option<(usize, usize)> {
        self.location
    }

    /// Reply shape used to report the error.
    #[must_use]
    pub const fn shape(&self) -> ReplyShape {
        self.shape
    }
}
