//! # hpx-eventsource
//!
//! Reconnecting Server-Sent Events client.
//!
//! - **Connection State Machine**: [`EventSource`] drives a sequential
//!   reconnect loop through `Raw → Connecting → Open → Closed`, with
//!   `Shutdown` reserved for caller-initiated [`close()`](EventSource::close).
//! - **Decorrelated Jitter**: [`Backoff`] spaces reconnect attempts between
//!   the base delay and a configurable cap. Servers may move the base with
//!   `retry:`.
//! - **SSE Framing**: [`parse::classify_line`] labels each line and
//!   [`EventBuffer`] accumulates fields into [`Message`]s, dispatching on
//!   blank lines. `Last-Event-ID` survives reconnects.
//! - **Injected Transport**: the [`Transport`] trait isolates HTTP.
//!   [`HttpTransport`] streams over `reqwest`; tests can substitute doubles.
//!
//! # Architecture
//!
//! ```text
//! EventSource::start()
//!   └─ loop ──► Backoff::next_delay()          (skipped on first attempt)
//!        │
//!        ├── Transport::stream(request, cancel, sink)
//!        │      └─ on_line ──► classify_line ──► EventBuffer::feed
//!        │                                          │
//!        └── EventSourceHandler ◄── on_open / on_closed / on_message / on_comment / on_error
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use hpx_eventsource::{
//!     EventSource, EventSourceConfig,
//!     handlers::{ChannelHandler, Notification},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EventSourceConfig::new("https://api.example.com/v1/stream")
//!     .reconnect_initial_delay(Duration::from_millis(500))
//!     .reconnect_max_delay(Duration::from_secs(30));
//!
//! let (handler, mut notifications) = ChannelHandler::new();
//! let source = Arc::new(EventSource::http(config, handler)?);
//! let task = EventSource::spawn(&source);
//!
//! while let Some(notification) = notifications.next_notification().await {
//!     if let Notification::Message { event, message } = notification {
//!         println!("{event}: {}", message.data());
//!         break;
//!     }
//! }
//!
//! source.close();
//! task.await??;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod parse;
pub mod reconnect;
pub mod transport;
pub mod types;

#[cfg(feature = "http")]
pub mod http;

// Re-export commonly used types
pub use config::EventSourceConfig;
pub use connection::EventSource;
pub use dispatch::{Dispatch, EventBuffer};
pub use error::{EventSourceError, EventSourceResult};
pub use handler::EventSourceHandler;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use reconnect::Backoff;
pub use tokio_util::sync::CancellationToken;
pub use transport::{StreamRequest, Transport, TransportEvents};
pub use types::{ConnectionState, Message};
