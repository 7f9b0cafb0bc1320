//! Handler that logs every notification.

use tracing::{debug, info, warn};

use crate::{
    error::EventSourceError,
    handler::EventSourceHandler,
    types::{ConnectionState, Message},
};

/// Logs notifications via `tracing`. Useful as a default or while debugging.
#[derive(Clone, Debug, Default)]
pub struct LoggingHandler;

impl LoggingHandler {
    /// Create a new logging handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EventSourceHandler for LoggingHandler {
    fn on_open(&self, state: ConnectionState) {
        info!(%state, "Event source opened");
    }

    fn on_closed(&self, state: ConnectionState) {
        info!(%state, "Event source closed");
    }

    fn on_message(&self, message: &Message, event: &str) {
        debug!(
            event,
            id = message.last_event_id(),
            origin = message.origin(),
            bytes = message.data().len(),
            "Event received"
        );
    }

    fn on_comment(&self, comment: &str) {
        debug!(comment, "Comment received");
    }

    fn on_error(&self, error: &EventSourceError) {
        warn!(error = %error, "Event source error");
    }
}
