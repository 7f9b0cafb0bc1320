//! Connection state machine and reconnect loop.
//!
//! [`EventSource`] owns the connection state, the reconnect backoff, and the
//! pending event buffer. [`EventSource::start`] runs the reconnect loop on the
//! caller's task; [`EventSource::close`] may be called from anywhere to shut
//! it down.

use std::{mem, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::EventSourceConfig,
    dispatch::{Dispatch, EventBuffer},
    error::{EventSourceError, EventSourceResult},
    handler::EventSourceHandler,
    parse::classify_line,
    reconnect::{Backoff, as_millis},
    transport::{StreamRequest, Transport, TransportEvents},
    types::ConnectionState,
};

// ---------------------------------------------------------------------------
// Public API: EventSource
// ---------------------------------------------------------------------------

/// Reconnecting SSE client.
///
/// Share it behind an [`Arc`] to call [`close()`](EventSource::close) while
/// [`start()`](EventSource::start) is running elsewhere.
pub struct EventSource<T, H> {
    config: Arc<EventSourceConfig>,
    transport: T,
    handler: H,
    state: Mutex<ConnectionState>,
    cancel: Mutex<CancellationToken>,
    backoff: Mutex<Backoff>,
    buffer: Mutex<EventBuffer>,
}

#[cfg(feature = "http")]
impl<H: EventSourceHandler> EventSource<crate::http::HttpTransport, H> {
    /// Create an event source that streams over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the HTTP client
    /// cannot be built.
    pub fn http(config: EventSourceConfig, handler: H) -> EventSourceResult<Self> {
        let transport = crate::http::HttpTransport::new(&config)?;
        Self::new(config, transport, handler)
    }
}

impl<T: Transport, H: EventSourceHandler> EventSource<T, H> {
    /// Create an event source with an injected transport.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: EventSourceConfig, transport: T, handler: H) -> EventSourceResult<Self> {
        config.validate().map_err(EventSourceError::config)?;

        let backoff = Backoff::new(config.reconnect_initial_delay, config.reconnect_max_delay);
        let mut buffer = EventBuffer::new(config.url.clone());
        if let Some(id) = &config.last_event_id {
            buffer = buffer.with_last_event_id(id.clone());
        }

        Ok(Self {
            config: Arc::new(config),
            transport,
            handler,
            state: Mutex::new(ConnectionState::Raw),
            cancel: Mutex::new(CancellationToken::new()),
            backoff: Mutex::new(backoff),
            buffer: Mutex::new(buffer),
        })
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// The most recent event ID received (empty if none).
    pub fn last_event_id(&self) -> String {
        self.buffer.lock().last_event_id().to_owned()
    }

    /// Reconnect attempts since the last successful connection.
    pub fn backoff_attempts(&self) -> u32 {
        self.backoff.lock().attempt_count()
    }

    /// The configuration this source was built with.
    pub fn config(&self) -> &EventSourceConfig {
        &self.config
    }

    /// Run the reconnect loop until [`close()`](EventSource::close) is called
    /// or the transport is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::InvalidState`] if a connection attempt
    /// begins while another is connecting or open. Transport failures are
    /// reported through [`EventSourceHandler::on_error`] and retried.
    pub async fn start(&self) -> EventSourceResult<()> {
        let cancel = self.cancel.lock().clone();
        let mut first_attempt = true;

        loop {
            if !first_attempt && !self.sleep_before_retry(&cancel).await {
                debug!("SSE backoff interrupted by shutdown");
                return Ok(());
            }

            if !self.begin_connecting(&cancel, first_attempt)? {
                debug!("SSE reconnect skipped after shutdown");
                return Ok(());
            }
            first_attempt = false;

            match self.run_attempt(&cancel).await {
                Ok(()) => {
                    info!(url = %self.config.url, "SSE stream ended");
                    self.backoff.lock().reset();
                    self.enter(ConnectionState::Closed);
                }
                Err(err) if err.is_cancelled() => {
                    if self.state().is_shutdown() {
                        debug!("SSE transport cancelled after shutdown");
                        return Ok(());
                    }
                    self.replace_cancellation().cancel();
                    self.enter(ConnectionState::Closed);
                    self.handler.on_error(&err);
                    warn!(url = %self.config.url, "SSE transport cancelled, not retrying");
                    return Ok(());
                }
                Err(err) => {
                    if self.state().is_shutdown() {
                        debug!(error = %err, "Ignoring SSE error after shutdown");
                        return Ok(());
                    }
                    self.enter(ConnectionState::Closed);
                    self.handler.on_error(&err);
                    warn!(url = %self.config.url, error = %err, "SSE connection failed");
                }
            }
        }
    }

    /// Run [`start()`](EventSource::start) on a new Tokio task.
    pub fn spawn(this: &Arc<Self>) -> JoinHandle<EventSourceResult<()>> {
        let source = Arc::clone(this);
        tokio::spawn(async move { source.start().await })
    }

    /// Shut the connection down. Idempotent.
    ///
    /// Does nothing if the source was never started or is already shut down.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, ConnectionState::Raw | ConnectionState::Shutdown) {
                return;
            }
            *state = ConnectionState::Shutdown;
            // Cancel under the state lock so `begin_connecting` never sees
            // `Shutdown` paired with a live token from the same run.
            self.replace_cancellation().cancel();
        }

        info!(url = %self.config.url, "SSE connection closing (requested)");
        self.handler.on_closed(ConnectionState::Shutdown);
    }

    // -----------------------------------------------------------------------
    // Internal: state transitions
    // -----------------------------------------------------------------------

    /// Move to `Connecting` for the run holding `cancel`.
    ///
    /// Returns `Ok(false)` when the run must stop instead: its token was
    /// cancelled, or `close()` landed between two attempts. Only the first
    /// attempt of a run may leave `Shutdown`.
    fn begin_connecting(
        &self,
        cancel: &CancellationToken,
        first_attempt: bool,
    ) -> EventSourceResult<bool> {
        let mut state = self.state.lock();
        if cancel.is_cancelled() || (!first_attempt && state.is_shutdown()) {
            return Ok(false);
        }
        if state.is_active() {
            return Err(EventSourceError::invalid_state(*state));
        }
        *state = ConnectionState::Connecting;
        Ok(true)
    }

    /// Move to `next` and notify. Same-state transitions are silent, and only
    /// `begin_connecting` may leave `Shutdown`.
    fn enter(&self, next: ConnectionState) {
        {
            let mut state = self.state.lock();
            if *state == next || state.is_shutdown() {
                return;
            }
            debug!(from = %*state, to = %next, "SSE state transition");
            *state = next;
        }

        match next {
            ConnectionState::Open => self.handler.on_open(next),
            ConnectionState::Closed | ConnectionState::Shutdown => self.handler.on_closed(next),
            ConnectionState::Raw | ConnectionState::Connecting => {}
        }
    }

    /// Install a fresh token and hand back the old one.
    fn replace_cancellation(&self) -> CancellationToken {
        mem::replace(&mut *self.cancel.lock(), CancellationToken::new())
    }

    // -----------------------------------------------------------------------
    // Internal: reconnect loop steps
    // -----------------------------------------------------------------------

    /// Returns `false` if cancelled while waiting.
    async fn sleep_before_retry(&self, cancel: &CancellationToken) -> bool {
        let (delay, attempt) = {
            let mut backoff = self.backoff.lock();
            if backoff.base_delay().is_zero() {
                return !cancel.is_cancelled();
            }
            (backoff.next_delay(), backoff.attempt_count())
        };

        warn!(
            attempt,
            delay_ms = as_millis(delay),
            "SSE reconnecting after backoff"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    async fn run_attempt(&self, cancel: &CancellationToken) -> EventSourceResult<()> {
        let last_event_id = {
            let mut buffer = self.buffer.lock();
            buffer.discard_pending();
            buffer.last_event_id().to_owned()
        };
        let last_event_id = (!last_event_id.is_empty()).then_some(last_event_id);

        info!(
            url = %self.config.url,
            attempt = self.backoff_attempts(),
            last_event_id = last_event_id.as_deref().unwrap_or(""),
            "SSE connecting"
        );

        let request = StreamRequest {
            config: Arc::clone(&self.config),
            last_event_id,
        };
        let mut sink = LineSink { source: self };
        self.transport
            .stream(request, cancel.clone(), &mut sink)
            .await
    }

    fn process_line(&self, line: &str) {
        let dispatch = self.buffer.lock().feed(classify_line(line));

        match dispatch {
            Some(Dispatch::Message { event, message }) => {
                debug!(
                    event = %event,
                    id = message.last_event_id(),
                    "SSE event received"
                );
                self.handler.on_message(&message, &event);
            }
            Some(Dispatch::Comment(comment)) => self.handler.on_comment(&comment),
            Some(Dispatch::Retry(delay)) => self.apply_retry(delay),
            None => {}
        }
    }

    fn apply_retry(&self, delay: Duration) {
        self.backoff.lock().set_base_delay(delay);
        debug!(retry_ms = as_millis(delay), "SSE retry directive applied");
    }
}

// ---------------------------------------------------------------------------
// Internal: transport callbacks
// ---------------------------------------------------------------------------

struct LineSink<'a, T, H> {
    source: &'a EventSource<T, H>,
}

impl<T: Transport, H: EventSourceHandler> TransportEvents for LineSink<'_, T, H> {
    fn on_open(&mut self) {
        info!(url = %self.source.config.url, "SSE connection established");
        self.source.backoff.lock().reset();
        self.source.enter(ConnectionState::Open);
    }

    fn on_line(&mut self, line: &str) {
        self.source.process_line(line);
    }

    fn on_close(&mut self) {
        self.source.enter(ConnectionState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct IdleTransport;

    #[async_trait]
    impl Transport for IdleTransport {
        async fn stream(
            &self,
            _request: StreamRequest,
            cancel: CancellationToken,
            events: &mut (dyn TransportEvents + Send),
        ) -> EventSourceResult<()> {
            events.on_open();
            cancel.cancelled().await;
            Err(EventSourceError::TransportCancelled)
        }
    }

    struct NoopHandler;
    impl EventSourceHandler for NoopHandler {}

    fn source() -> EventSource<IdleTransport, NoopHandler> {
        let config = EventSourceConfig::new("http://127.0.0.1:1/events")
            .last_event_id("seed-1")
            .reconnect_initial_delay(Duration::ZERO)
            .reconnect_max_delay(Duration::ZERO);
        EventSource::new(config, IdleTransport, NoopHandler).expect("valid config")
    }

    #[test]
    fn test_new_validates_config() {
        let result = EventSource::new(EventSourceConfig::default(), IdleTransport, NoopHandler);
        assert!(matches!(result, Err(EventSourceError::Config { .. })));
    }

    #[test]
    fn test_initial_state() {
        let source = source();
        assert_eq!(source.state(), ConnectionState::Raw);
        assert_eq!(source.last_event_id(), "seed-1");
        assert_eq!(source.backoff_attempts(), 0);
    }

    #[test]
    fn test_close_before_start_is_noop() {
        let source = source();
        let token = source.cancel.lock().clone();
        source.close();
        assert_eq!(source.state(), ConnectionState::Raw);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_close_swaps_and_cancels_token() {
        let source = source();
        *source.state.lock() = ConnectionState::Open;
        let old = source.cancel.lock().clone();

        source.close();

        assert_eq!(source.state(), ConnectionState::Shutdown);
        assert!(old.is_cancelled());
        assert!(!source.cancel.lock().is_cancelled());
    }

    #[test]
    fn test_begin_connecting_guard() {
        let source = source();
        let token = source.cancel.lock().clone();
        assert!(matches!(source.begin_connecting(&token, true), Ok(true)));
        assert!(matches!(
            source.begin_connecting(&token, false),
            Err(EventSourceError::InvalidState {
                state: ConnectionState::Connecting
            })
        ));
    }

    #[test]
    fn test_begin_connecting_after_close_stops_run() {
        let source = source();
        let token = source.cancel.lock().clone();
        assert!(matches!(source.begin_connecting(&token, true), Ok(true)));

        source.close();

        // The run that was live during close() must not reconnect.
        assert!(matches!(source.begin_connecting(&token, false), Ok(false)));
        assert_eq!(source.state(), ConnectionState::Shutdown);
    }

    #[test]
    fn test_later_attempt_does_not_leave_shutdown() {
        let source = source();
        *source.state.lock() = ConnectionState::Shutdown;
        let token = source.cancel.lock().clone();

        assert!(matches!(source.begin_connecting(&token, false), Ok(false)));
        assert_eq!(source.state(), ConnectionState::Shutdown);

        // A new run may restart from `Shutdown`.
        assert!(matches!(source.begin_connecting(&token, true), Ok(true)));
        assert_eq!(source.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_enter_does_not_leave_shutdown() {
        let source = source();
        *source.state.lock() = ConnectionState::Shutdown;
        source.enter(ConnectionState::Closed);
        source.enter(ConnectionState::Open);
        assert_eq!(source.state(), ConnectionState::Shutdown);
    }

    #[test]
    fn test_retry_line_updates_backoff_base() {
        let source = source();
        source.process_line("retry: 1500");
        assert_eq!(
            source.backoff.lock().base_delay(),
            Duration::from_millis(1500)
        );
        source.process_line("retry: abc");
        assert_eq!(
            source.backoff.lock().base_delay(),
            Duration::from_millis(1500)
        );
    }

    #[tokio::test]
    async fn test_start_then_close() {
        let source = Arc::new(source());
        let task = EventSource::spawn(&source);

        tokio::time::timeout(Duration::from_secs(2), async {
            while source.state() != ConnectionState::Open {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("opened");

        source.close();
        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("loop exits")
            .expect("task joins");
        assert!(result.is_ok());
        assert_eq!(source.state(), ConnectionState::Shutdown);
    }
}
