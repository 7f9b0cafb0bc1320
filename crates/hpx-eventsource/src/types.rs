//! Core type definitions for connection state and dispatched messages.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

/// Connection state machine states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// Never started.
    #[default]
    Raw,
    /// Attempting to establish a connection.
    Connecting,
    /// Actively receiving lines.
    Open,
    /// Stream ended or failed; the loop will retry.
    Closed,
    /// Closed by the caller. Terminal for the current run.
    Shutdown,
}

impl ConnectionState {
    /// Returns `true` while a connection attempt or stream is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Returns `true` if the stream is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the caller shut the connection down.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "Raw"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// A dispatched event payload.
///
/// Produced once per dispatch and handed to the caller; the connection keeps
/// no reference to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    data: String,
    last_event_id: String,
    origin: String,
}

impl Message {
    /// Create a new message.
    pub fn new(
        data: impl Into<String>,
        last_event_id: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            last_event_id: last_event_id.into(),
            origin: origin.into(),
        }
    }

    /// The `data` lines of the event, joined by `\n`.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The last event ID seen on the stream when this message was dispatched.
    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// The stream URL the message came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Deserialize the data payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid JSON for `T`.
    pub fn data_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }

    /// Consume the message, returning the data payload.
    pub fn into_data(self) -> String {
        self.data
    }
}
