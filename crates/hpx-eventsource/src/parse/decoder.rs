//! Splits response body chunks into SSE lines.

use core::str::Utf8Error;

use bytes::{Buf, BytesMut};

use super::constants::{BOM, CR, LF};

#[derive(Debug, Clone, Copy)]
enum DecoderState {
    NotStarted,
    Started,
    Finished,
}

/// Incremental line splitter.
///
/// Handles BOM detection, line-ending normalisation (LF / CR / CRLF), and
/// lines split across chunk boundaries.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: BytesMut,
    state: DecoderState,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            state: DecoderState::NotStarted,
        }
    }

    /// Append a chunk of body bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() || matches!(self.state, DecoderState::Finished) {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        if matches!(self.state, DecoderState::NotStarted) {
            match starts_with_bom(&self.buffer) {
                Some(true) => {
                    self.state = DecoderState::Started;
                    self.buffer.advance(BOM.len());
                }
                Some(false) => self.state = DecoderState::Started,
                None => {}
            }
        }
    }

    /// Mark end-of-stream.
    ///
    /// A trailing CR is treated as a terminator and any unterminated remainder
    /// becomes the final line.
    pub fn finish(&mut self) {
        if matches!(self.state, DecoderState::Finished) {
            return;
        }
        self.state = DecoderState::Finished;
        // A trailing "\r" plus the synthetic "\n" reads as a single CRLF.
        if !self.buffer.is_empty() && self.buffer.last() != Some(&LF) {
            self.buffer.extend_from_slice(&[LF]);
        }
    }

    /// Pop the next complete line, if any.
    pub fn next_line(&mut self) -> Option<Result<String, Utf8Error>> {
        if matches!(self.state, DecoderState::NotStarted) {
            return None;
        }
        let (line_end, rem_start) = find_eol(&self.buffer)?;

        let line = self.buffer.split_to(line_end);
        self.buffer.advance(rem_start - line_end);

        Some(core::str::from_utf8(&line).map(str::to_owned))
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Finds the next end-of-line in `bytes`.
///
/// Returns `(line_end, remainder_start)`. Returns `None` if more data is
/// needed (e.g. buffer ends with a lone CR that could be part of a CRLF pair).
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let first_match = memchr::memchr2(CR, LF, bytes)?;

    if bytes[first_match] == LF {
        return Some((first_match, first_match + 1));
    }
    match bytes.get(first_match + 1) {
        None => None,
        Some(&LF) => Some((first_match, first_match + 2)),
        Some(_) => Some((first_match, first_match + 1)),
    }
}

const fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    match buf.len() {
        0 => None,
        1 => {
            if buf[0] == BOM[0] {
                None
            } else {
                Some(false)
            }
        }
        2 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] {
                None
            } else {
                Some(false)
            }
        }
        _gte_3 => Some(buf[0] == BOM[0] && buf[1] == BOM[1] && buf[2] == BOM[2]),
    }
}
