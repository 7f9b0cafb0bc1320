//! Tail an SSE endpoint and print every event.
//!
//! Run with: `cargo run -p hpx-eventsource --example tail -- https://example.com/stream`
//!
//! Set `RUST_LOG=hpx_eventsource=debug` to watch the reconnect loop.

use std::{sync::Arc, time::Duration};

use hpx_eventsource::{
    EventSource, EventSourceConfig,
    handlers::{ChannelHandler, Notification},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080/events".to_string());

    let config = EventSourceConfig::new(url)
        .connect_timeout(Duration::from_secs(10))
        .reconnect_initial_delay(Duration::from_secs(1))
        .reconnect_max_delay(Duration::from_secs(30));

    let (handler, mut notifications) = ChannelHandler::new();
    let source = Arc::new(EventSource::http(config, handler)?);
    let task = EventSource::spawn(&source);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notification = notifications.next_notification() => match notification {
                Some(Notification::Message { event, message }) => {
                    println!("[{event}] id={} {}", message.last_event_id(), message.data());
                }
                Some(Notification::Comment(comment)) => println!(": {comment}"),
                Some(Notification::Opened(state)) | Some(Notification::Closed(state)) => {
                    println!("-- {state}");
                }
                Some(Notification::Error(error)) => eprintln!("!! {error}"),
                None => break,
            },
        }
    }

    source.close();
    task.await??;
    Ok(())
}
