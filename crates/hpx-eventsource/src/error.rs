//! Error handling for the event source.

use std::time::Duration;

use thiserror::Error;

use crate::types::ConnectionState;

/// The main result type used throughout the event source.
pub type EventSourceResult<T> = Result<T, EventSourceError>;

/// Errors raised by the connection state machine and its transports.
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// `start()` was called while a connection is already active.
    #[error("Invalid state: cannot connect while {state}")]
    InvalidState { state: ConnectionState },

    /// The in-flight transport operation was aborted through its cancellation token.
    #[error("Transport cancelled")]
    TransportCancelled,

    /// HTTP request errors
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Unexpected HTTP status: {status}")]
    InvalidStatus { status: http::StatusCode },

    /// The server answered with something other than `text/event-stream`.
    #[error("Unexpected content type: {content_type}")]
    InvalidContentType { content_type: String },

    /// The event stream failed mid-read.
    #[error("Stream error: {message}")]
    Stream { message: String },

    /// The event stream contained invalid UTF-8.
    #[error("Invalid UTF-8 in event stream: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl EventSourceError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(state: ConnectionState) -> Self {
        Self::InvalidState { state }
    }

    /// Create an invalid-status error.
    pub fn invalid_status(status: http::StatusCode) -> Self {
        Self::InvalidStatus { status }
    }

    /// Create an invalid-content-type error.
    pub fn invalid_content_type(content_type: impl Into<String>) -> Self {
        Self::InvalidContentType {
            content_type: content_type.into(),
        }
    }

    /// Returns `true` if the transport was aborted via its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::TransportCancelled)
    }

    /// Returns `true` for transport-level failures the reconnect loop recovers from.
    pub fn is_transport_failure(&self) -> bool {
        !matches!(
            self,
            Self::InvalidState { .. } | Self::TransportCancelled | Self::Config { .. }
        )
    }
}
