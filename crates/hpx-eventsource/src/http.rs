//! HTTP transport built on `reqwest` streaming bodies.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::EventSourceConfig,
    error::{EventSourceError, EventSourceResult},
    parse::LineDecoder,
    transport::{StreamRequest, Transport, TransportEvents},
};

const EVENT_STREAM: &str = "text/event-stream";

/// [`Transport`] that issues an HTTP request and streams the response body.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose client honours the configured connect timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &EventSourceConfig) -> EventSourceResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| EventSourceError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (for shared pools, proxies, or custom TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_request(&self, request: &StreamRequest) -> reqwest::RequestBuilder {
        let config = &request.config;

        let mut headers = config.headers.clone();
        headers.insert(
            http::header::ACCEPT,
            http::HeaderValue::from_static(EVENT_STREAM),
        );
        headers.insert(
            http::header::CACHE_CONTROL,
            http::HeaderValue::from_static("no-cache"),
        );

        // Last-Event-ID for resumption.
        if let Some(id) = request.last_event_id.as_deref()
            && !id.is_empty()
            && let Ok(value) = http::HeaderValue::from_str(id)
        {
            headers.insert(
                http::header::HeaderName::from_static("last-event-id"),
                value,
            );
        }

        let mut req = self
            .client
            .request(config.method.clone(), &config.url)
            .headers(headers);
        if let Some(body) = &config.body {
            req = req.body(body.clone());
        }
        req
    }

    async fn connect(&self, request: &StreamRequest) -> EventSourceResult<reqwest::Response> {
        let connect_timeout = request.config.connect_timeout;
        let resp = timeout(connect_timeout, self.build_request(request).send())
            .await
            .map_err(|_| EventSourceError::timeout(connect_timeout))??;

        let status = resp.status();
        if !status.is_success() {
            return Err(EventSourceError::invalid_status(status));
        }

        if let Some(ct) = resp.headers().get(http::header::CONTENT_TYPE) {
            let ct_str = ct.to_str().unwrap_or("");
            if !ct_str.contains(EVENT_STREAM) {
                return Err(EventSourceError::invalid_content_type(ct_str));
            }
        }

        Ok(resp)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn stream(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
        events: &mut (dyn TransportEvents + Send),
    ) -> EventSourceResult<()> {
        let resp = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EventSourceError::TransportCancelled),
            resp = self.connect(&request) => resp?,
        };

        debug!(url = %request.config.url, status = %resp.status(), "SSE response accepted");
        events.on_open();

        let read_timeout = request.config.read_timeout;
        let mut body = Box::pin(resp.bytes_stream());
        let mut decoder = LineDecoder::new();

        let result = loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => break Err(EventSourceError::TransportCancelled),
                chunk = read_chunk(&mut body, read_timeout) => chunk,
            };

            match chunk {
                Ok(Some(bytes)) => {
                    decoder.push(&bytes);
                    if let Err(err) = drain_lines(&mut decoder, events) {
                        break Err(err);
                    }
                }
                Ok(None) => {
                    decoder.finish();
                    break drain_lines(&mut decoder, events);
                }
                Err(err) => break Err(err),
            }
        };

        events.on_close();
        result
    }
}

async fn read_chunk<S>(body: &mut S, read_timeout: Option<Duration>) -> EventSourceResult<Option<Bytes>>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    let next = match read_timeout {
        Some(limit) => timeout(limit, body.next())
            .await
            .map_err(|_| EventSourceError::timeout(limit))?,
        None => body.next().await,
    };
    next.transpose().map_err(EventSourceError::from)
}

fn drain_lines(
    decoder: &mut LineDecoder,
    events: &mut (dyn TransportEvents + Send),
) -> EventSourceResult<()> {
    while let Some(line) = decoder.next_line() {
        events.on_line(&line?);
    }
    Ok(())
}
