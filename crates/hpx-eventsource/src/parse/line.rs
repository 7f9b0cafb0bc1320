//! Classification of a single SSE line.

use super::constants::{DATA_FIELD, EVENT_FIELD, ID_FIELD, RETRY_FIELD};

/// A classified line from an SSE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace-only line (event delimiter).
    Blank,
    /// Comment line (starts with `:`), holding the text after the marker.
    Comment(&'a str),
    /// A `name: value` field line.
    Field(Field<'a>),
}

/// Field names recognised by the dispatcher, per the
/// [HTML Living Standard](https://html.spec.whatwg.org/multipage/server-sent-events.html#event-stream-interpretation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Data,
    Id,
    Event,
    Retry,
    Ignored,
}

/// One `name: value` line. Borrowed from the input, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field name, trimmed.
    pub name: &'a str,
    /// Field value with a single leading space removed.
    pub value: &'a str,
}

impl Field<'_> {
    /// Map the raw name onto a known field.
    pub fn kind(&self) -> FieldName {
        match self.name {
            DATA_FIELD => FieldName::Data,
            ID_FIELD => FieldName::Id,
            EVENT_FIELD => FieldName::Event,
            RETRY_FIELD => FieldName::Retry,
            _ => FieldName::Ignored,
        }
    }

    /// Parse the value as a retry interval in milliseconds.
    ///
    /// The value must be a signed 64-bit integer that is not negative;
    /// anything else is treated as absent.
    pub fn retry_millis(&self) -> Option<u64> {
        self.value
            .parse::<i64>()
            .ok()
            .and_then(|ms| u64::try_from(ms).ok())
    }
}

/// Classify one line of text (without its terminator).
pub fn classify_line(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }

    match line.find(':') {
        Some(0) => Line::Comment(strip_leading_space(&line[1..])),
        Some(colon_pos) => Line::Field(Field {
            name: line[..colon_pos].trim(),
            value: strip_leading_space(&line[colon_pos + 1..]),
        }),
        None => Line::Field(Field {
            name: line.trim(),
            value: "",
        }),
    }
}

fn strip_leading_space(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(name: &'a str, value: &'a str) -> Line<'a> {
        Line::Field(Field { name, value })
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(classify_line(""), Line::Blank);
        assert_eq!(classify_line("   "), Line::Blank);
        assert_eq!(classify_line("\t"), Line::Blank);
    }

    #[test]
    fn test_comment_lines() {
        assert_eq!(classify_line(": keep-alive"), Line::Comment("keep-alive"));
        assert_eq!(classify_line(":ping"), Line::Comment("ping"));
        assert_eq!(classify_line(":"), Line::Comment(""));
        // Only the first colon is the marker.
        assert_eq!(classify_line(":a:b"), Line::Comment("a:b"));
    }

    #[test]
    fn test_field_lines() {
        assert_eq!(classify_line("data: hello"), field("data", "hello"));
        assert_eq!(classify_line("data:hello"), field("data", "hello"));
        // Only one leading space is stripped.
        assert_eq!(classify_line("data:  two"), field("data", " two"));
        // Trailing whitespace is kept.
        assert_eq!(classify_line("data: x "), field("data", "x "));
        // Value may itself contain colons.
        assert_eq!(
            classify_line("data: {\"a\":1}"),
            field("data", "{\"a\":1}")
        );
        assert_eq!(classify_line(" event : update"), field("event", "update"));
    }

    #[test]
    fn test_field_without_colon() {
        assert_eq!(classify_line("data"), field("data", ""));
        assert_eq!(classify_line("  id  "), field("id", ""));
    }

    #[test]
    fn test_field_kind() {
        let kind = |line| match classify_line(line) {
            Line::Field(f) => f.kind(),
            other => panic!("expected field, got {other:?}"),
        };
        assert_eq!(kind("data: x"), FieldName::Data);
        assert_eq!(kind("id: 1"), FieldName::Id);
        assert_eq!(kind("event: tick"), FieldName::Event);
        assert_eq!(kind("retry: 10"), FieldName::Retry);
        assert_eq!(kind("Data: x"), FieldName::Ignored);
        assert_eq!(kind("foo: bar"), FieldName::Ignored);
    }

    #[test]
    fn test_retry_millis() {
        let retry = |value| Field { name: "retry", value }.retry_millis();
        assert_eq!(retry("1500"), Some(1500));
        assert_eq!(retry("0"), Some(0));
        assert_eq!(retry("abc"), None);
        assert_eq!(retry("-5"), None);
        assert_eq!(retry("1.5"), None);
        assert_eq!(retry(""), None);
        assert_eq!(retry("99999999999999999999"), None);
    }
}
