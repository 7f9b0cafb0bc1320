//! Channel-backed handler.
//!
//! [`ChannelHandler`] turns callbacks into a [`Stream`] of [`Notification`]s
//! so callers can consume them with `StreamExt` combinators.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::{
    error::EventSourceError,
    handler::EventSourceHandler,
    types::{ConnectionState, Message},
};

/// One notification raised by the connection.
#[derive(Debug)]
pub enum Notification {
    /// Stream opened.
    Opened(ConnectionState),
    /// Stream closed.
    Closed(ConnectionState),
    /// Event dispatched.
    Message {
        /// Event name.
        event: String,
        /// Dispatched message.
        message: Message,
    },
    /// Comment line received.
    Comment(String),
    /// Attempt failed.
    Error(ErrorReport),
}

/// Owned snapshot of an [`EventSourceError`] delivered through the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    message: String,
    cancelled: bool,
    transport_failure: bool,
}

impl ErrorReport {
    /// Rendered error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// See [`EventSourceError::is_cancelled`].
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// See [`EventSourceError::is_transport_failure`].
    pub fn is_transport_failure(&self) -> bool {
        self.transport_failure
    }
}

impl From<&EventSourceError> for ErrorReport {
    fn from(error: &EventSourceError) -> Self {
        Self {
            message: error.to_string(),
            cancelled: error.is_cancelled(),
            transport_failure: error.is_transport_failure(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Handler that forwards every notification into an unbounded channel.
///
/// Sends never block, so the reconnect loop is never stalled by a slow
/// consumer. Notifications sent after the stream is dropped are discarded.
#[derive(Clone, Debug)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelHandler {
    /// Create a handler and the stream that receives its notifications.
    #[must_use]
    pub fn new() -> (Self, NotificationStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, NotificationStream { rx })
    }

    fn send(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl EventSourceHandler for ChannelHandler {
    fn on_open(&self, state: ConnectionState) {
        self.send(Notification::Opened(state));
    }

    fn on_closed(&self, state: ConnectionState) {
        self.send(Notification::Closed(state));
    }

    fn on_message(&self, message: &Message, event: &str) {
        self.send(Notification::Message {
            event: event.to_owned(),
            message: message.clone(),
        });
    }

    fn on_comment(&self, comment: &str) {
        self.send(Notification::Comment(comment.to_owned()));
    }

    fn on_error(&self, error: &EventSourceError) {
        self.send(Notification::Error(ErrorReport::from(error)));
    }
}

/// Stream of [`Notification`]s from a [`ChannelHandler`].
pub struct NotificationStream {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationStream {
    /// Receive the next notification.
    pub async fn next_notification(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Take a notification if one is already queued.
    pub fn try_next(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_in_order() {
        let (handler, mut stream) = ChannelHandler::new();

        handler.on_open(ConnectionState::Open);
        handler.on_comment("keep-alive");
        handler.on_message(&Message::new("hi", "1", "http://x/s"), "greeting");
        handler.on_error(&EventSourceError::stream("reset"));
        handler.on_closed(ConnectionState::Closed);

        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Opened(ConnectionState::Open))
        ));
        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Comment(c)) if c == "keep-alive"
        ));
        match stream.next_notification().await {
            Some(Notification::Message { event, message }) => {
                assert_eq!(event, "greeting");
                assert_eq!(message.data(), "hi");
            }
            other => panic!("expected message, got {other:?}"),
        }
        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Error(e))
                if e.message() == "Stream error: reset" && e.is_transport_failure()
        ));
        assert!(matches!(
            stream.next_notification().await,
            Some(Notification::Closed(ConnectionState::Closed))
        ));
        assert!(stream.try_next().is_none());
    }

    #[test]
    fn test_error_report_keeps_classification() {
        let cancelled = ErrorReport::from(&EventSourceError::TransportCancelled);
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_transport_failure());
        assert_eq!(cancelled.to_string(), "Transport cancelled");

        let timeout = ErrorReport::from(&EventSourceError::timeout(
            std::time::Duration::from_millis(50),
        ));
        assert!(!timeout.is_cancelled());
        assert!(timeout.is_transport_failure());
    }

    #[test]
    fn test_send_after_drop_is_ignored() {
        let (handler, stream) = ChannelHandler::new();
        drop(stream);
        handler.on_comment("nobody listening");
    }
}
