//! Ready-to-use [`EventSourceHandler`](crate::EventSourceHandler) implementations.
//!
//! - [`ChannelHandler`]: forwards notifications into a [`NotificationStream`]
//! - [`LoggingHandler`]: logs notifications via `tracing`

mod channel;
mod logging;

pub use channel::{ChannelHandler, ErrorReport, Notification, NotificationStream};
pub use logging::LoggingHandler;
