//! Notification trait for connection lifecycle and stream events.

use crate::{error::EventSourceError, types::ConnectionState, types::Message};

/// Observer for everything an [`EventSource`](crate::EventSource) reports.
///
/// All methods are called synchronously, in order, on the task running
/// [`EventSource::start`](crate::EventSource::start). Blocking in a callback
/// stalls the reconnect loop.
pub trait EventSourceHandler: Send + Sync + 'static {
    /// Called when the transport reports the stream as open.
    ///
    /// Default implementation does nothing.
    fn on_open(&self, _state: ConnectionState) {}

    /// Called when the connection moves to `Closed` or `Shutdown`.
    ///
    /// Default implementation does nothing.
    fn on_closed(&self, _state: ConnectionState) {}

    /// Called once per dispatched event.
    ///
    /// Default implementation does nothing.
    fn on_message(&self, _message: &Message, _event: &str) {}

    /// Called for every comment line.
    ///
    /// Default implementation does nothing.
    fn on_comment(&self, _comment: &str) {}

    /// Called when an attempt fails.
    ///
    /// Default implementation does nothing.
    fn on_error(&self, _error: &EventSourceError) {}
}

impl<H: EventSourceHandler> EventSourceHandler for std::sync::Arc<H> {
    fn on_open(&self, state: ConnectionState) {
        (**self).on_open(state);
    }

    fn on_closed(&self, state: ConnectionState) {
        (**self).on_closed(state);
    }

    fn on_message(&self, message: &Message, event: &str) {
        (**self).on_message(message, event);
    }

    fn on_comment(&self, comment: &str) {
        (**self).on_comment(comment);
    }

    fn on_error(&self, error: &EventSourceError) {
        (**self).on_error(error);
    }
}
