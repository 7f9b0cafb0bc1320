//! Event buffering and dispatch.
//!
//! [`EventBuffer`] accumulates classified lines for one logical event and
//! produces a [`Dispatch`] whenever a line has an observable effect.

use std::time::Duration;

use crate::{
    parse::{FieldName, Line, constants::DEFAULT_EVENT},
    types::Message,
};

/// Outcome of feeding one line into an [`EventBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A blank line completed an event.
    Message {
        /// Event name (`"message"` unless an `event:` field set one).
        event: String,
        /// The completed message.
        message: Message,
    },
    /// A comment line.
    Comment(String),
    /// A valid `retry:` directive.
    Retry(Duration),
}

/// Pending state for the event currently being received.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    origin: String,
    data: Vec<String>,
    event: Option<String>,
    last_event_id: String,
}

impl EventBuffer {
    /// Create an empty buffer for messages from `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: Vec::new(),
            event: None,
            last_event_id: String::new(),
        }
    }

    /// Seed the last event ID, e.g. from configuration.
    #[must_use]
    pub fn with_last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = id.into();
        self
    }

    /// The most recent `id:` value. Survives dispatches and reconnects.
    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// Returns `true` if no `data:` line is pending.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop the partially received event, keeping the last event ID.
    pub fn discard_pending(&mut self) {
        self.data.clear();
        self.event = None;
    }

    /// Apply one classified line.
    pub fn feed(&mut self, line: Line<'_>) -> Option<Dispatch> {
        match line {
            Line::Blank => self.dispatch(),
            Line::Comment(text) => Some(Dispatch::Comment(text.to_owned())),
            Line::Field(field) => match field.kind() {
                FieldName::Data => {
                    self.data.push(field.value.to_owned());
                    None
                }
                FieldName::Id => {
                    if memchr::memchr(0, field.value.as_bytes()).is_none() {
                        self.last_event_id = field.value.to_owned();
                    }
                    None
                }
                FieldName::Event => {
                    self.event = Some(field.value.to_owned());
                    None
                }
                FieldName::Retry => field
                    .retry_millis()
                    .map(|ms| Dispatch::Retry(Duration::from_millis(ms))),
                FieldName::Ignored => None,
            },
        }
    }

    fn dispatch(&mut self) -> Option<Dispatch> {
        if self.data.is_empty() {
            return None;
        }

        let data = self.data.join("\n");
        self.data.clear();
        let event = match self.event.take() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_EVENT.to_owned(),
        };

        Some(Dispatch::Message {
            event,
            message: Message::new(data, self.last_event_id.clone(), self.origin.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::classify_line;

    const ORIGIN: &str = "https://example.com/stream";

    fn feed_all(buffer: &mut EventBuffer, lines: &[&str]) -> Vec<Dispatch> {
        lines
            .iter()
            .filter_map(|line| buffer.feed(classify_line(line)))
            .collect()
    }

    fn message(event: &str, data: &str, id: &str) -> Dispatch {
        Dispatch::Message {
            event: event.to_owned(),
            message: Message::new(data, id, ORIGIN),
        }
    }

    #[test]
    fn test_blank_without_data_is_silent() {
        let mut buffer = EventBuffer::new(ORIGIN);
        assert!(feed_all(&mut buffer, &["", "  ", "event: ping", ""]).is_empty());
    }

    #[test]
    fn test_multiline_data_joined_in_order() {
        let mut buffer = EventBuffer::new(ORIGIN);
        let out = feed_all(&mut buffer, &["data: one", "data: two", "data:three", ""]);
        assert_eq!(out, vec![message("message", "one\ntwo\nthree", "")]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_data_line_counts() {
        let mut buffer = EventBuffer::new(ORIGIN);
        let out = feed_all(&mut buffer, &["data", "data", ""]);
        assert_eq!(out, vec![message("message", "\n", "")]);
    }

    #[test]
    fn test_id_persists_across_dispatches() {
        let mut buffer = EventBuffer::new(ORIGIN);
        let out = feed_all(
            &mut buffer,
            &["id: 7", "data: a", "", "data: b", "", "id: 8", "data: c", ""],
        );
        assert_eq!(
            out,
            vec![
                message("message", "a", "7"),
                message("message", "b", "7"),
                message("message", "c", "8"),
            ]
        );
        assert_eq!(buffer.last_event_id(), "8");
    }

    #[test]
    fn test_id_with_nul_ignored() {
        let mut buffer = EventBuffer::new(ORIGIN).with_last_event_id("seed");
        feed_all(&mut buffer, &["id: bad\0id"]);
        assert_eq!(buffer.last_event_id(), "seed");
    }

    #[test]
    fn test_event_name_applies_to_next_dispatch_only() {
        let mut buffer = EventBuffer::new(ORIGIN);
        let out = feed_all(
            &mut buffer,
            &["event: update", "data: {\"x\":1}", "", "data: plain", ""],
        );
        assert_eq!(
            out,
            vec![
                message("update", "{\"x\":1}", ""),
                message("message", "plain", ""),
            ]
        );
    }

    #[test]
    fn test_comment_does_not_touch_pending() {
        let mut buffer = EventBuffer::new(ORIGIN);
        let out = feed_all(&mut buffer, &["data: a", ": keep-alive", "data: b", ""]);
        assert_eq!(
            out,
            vec![
                Dispatch::Comment("keep-alive".to_owned()),
                message("message", "a\nb", ""),
            ]
        );
    }

    #[test]
    fn test_retry_directive() {
        let mut buffer = EventBuffer::new(ORIGIN);
        assert_eq!(
            feed_all(&mut buffer, &["retry:1500", "retry: abc", "retry: -1"]),
            vec![Dispatch::Retry(Duration::from_millis(1500))]
        );
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut buffer = EventBuffer::new(ORIGIN);
        let out = feed_all(&mut buffer, &["foo: bar", "data: x", "baz", ""]);
        assert_eq!(out, vec![message("message", "x", "")]);
    }

    #[test]
    fn test_discard_pending_keeps_id() {
        let mut buffer = EventBuffer::new(ORIGIN);
        feed_all(&mut buffer, &["id: 3", "event: tick", "data: partial"]);
        buffer.discard_pending();
        assert!(buffer.is_empty());
        assert_eq!(buffer.last_event_id(), "3");

        let out = feed_all(&mut buffer, &["data: fresh", ""]);
        assert_eq!(out, vec![message("message", "fresh", "3")]);
    }
}
