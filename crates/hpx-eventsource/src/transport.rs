//! Transport abstraction consumed by the connection state machine.
//!
//! A [`Transport`] opens the stream and pushes lines into a
//! [`TransportEvents`] sink until the stream ends, fails, or the supplied
//! [`CancellationToken`] fires.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{config::EventSourceConfig, error::EventSourceResult};

/// Parameters for a single connection attempt.
#[derive(Clone, Debug)]
pub struct StreamRequest {
    /// Connection settings shared across attempts.
    pub config: Arc<EventSourceConfig>,
    /// Value for the `Last-Event-ID` header, if any event ID has been seen.
    pub last_event_id: Option<String>,
}

/// Callbacks a transport invokes while streaming.
pub trait TransportEvents {
    /// The stream has been established.
    fn on_open(&mut self);

    /// One line was received (terminator removed).
    fn on_line(&mut self, line: &str);

    /// The stream has ended or failed after being opened.
    fn on_close(&mut self);
}

/// Opens an SSE stream and delivers its lines.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Run one connection attempt to completion.
    ///
    /// Returns `Ok(())` when the server ends the stream.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::TransportCancelled`](crate::EventSourceError::TransportCancelled)
    /// when `cancel` fires, or any other variant for transport failures.
    async fn stream(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
        events: &mut (dyn TransportEvents + Send),
    ) -> EventSourceResult<()>;
}

#[async_trait]
impl<T: Transport> Transport for Arc<T> {
    async fn stream(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
        events: &mut (dyn TransportEvents + Send),
    ) -> EventSourceResult<()> {
        (**self).stream(request, cancel, events).await
    }
}
