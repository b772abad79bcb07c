//! Error types for chatreact.
//!
//! All errors are strongly typed using thiserror so callers can tell
//! markup drift (`MalformedContent`) apart from bad rule definitions
//! (`InvalidRegistration`) and from failures raised by their own responses.

use thiserror::Error;

use crate::fragment::Fragment;
use crate::listener::ListenerId;

/// Boxed error returned by a listener's response action.
pub type ResponseError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A message fragment did not have a recognized shape, or a recognized
/// shape was missing the data it requires.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Unrecognized fragment shape: {fragment:?}")]
    UnrecognizedFragment {
        fragment: Fragment,
    },

    #[error("Mention fragment '{text}' does not have the form @<username>")]
    MalformedMention {
        text: String,
    },

    #[error("Emote fragment has no image payload: {fragment:?}")]
    MissingEmoteImage {
        fragment: Fragment,
    },

    #[error("Cheer fragment has no amount attribute: {fragment:?}")]
    MissingCheerAmount {
        fragment: Fragment,
    },

    #[error("Cheer amount '{amount}' is not a non-negative integer")]
    InvalidCheerAmount {
        amount: String,
    },

    #[error("Bits total overflowed while adding {amount}")]
    BitsOverflow {
        amount: u64,
    },
}

/// Errors raised while building triggers or registering listeners.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("{kind} requires at least 2 children, got {actual}")]
    TooFewChildren {
        kind: &'static str,
        actual: usize,
    },
}

/// Top-level error type for chatreact.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Malformed content: {0}")]
    MalformedContent(#[from] ExtractError),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(#[from] RegistrationError),

    #[error("Response of listener {listener} failed: {source}")]
    Response {
        listener: ListenerId,
        #[source]
        source: ResponseError,
    },

    #[error("Message source error: {message}")]
    Source {
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ChatError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a message source error.
    #[must_use]
    pub fn source_error(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if extraction rejected the message markup.
    #[must_use]
    pub const fn is_malformed_content(&self) -> bool {
        matches!(self, Self::MalformedContent(_))
    }

    /// Returns true if a trigger or listener definition was rejected.
    #[must_use]
    pub const fn is_invalid_registration(&self) -> bool {
        matches!(self, Self::InvalidRegistration(_))
    }

    /// Returns true if a listener's response action failed.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response { .. })
    }
}

/// Result type alias for chatreact operations.
pub type ChatResult<T> = Result<T, ChatError>;
