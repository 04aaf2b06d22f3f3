//! Incremental frame decoder
//!
//! Bytes go in through [`FrameDecoder::feed`] in whatever pieces the
//! transport delivers; complete frames come out. Three pieces of state carry
//! over between calls:
//!
//! - trailing bytes of a UTF-8 sequence that was cut by a chunk boundary
//! - the last, not yet newline-terminated, line of text
//! - the pending `event:` name and `data:` payload of the frame being built
//!
//! The ordered frame sequence for a byte stream is therefore the same no
//! matter where the chunk boundaries fall.

use super::DecodeError;
use serde::de::IgnoredAny;
use serde_json::Value;

/// One decoded `(event, data)` unit from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event_name: String,
    pub raw_payload: String,
}

impl Frame {
    pub fn new(event_name: impl Into<String>, raw_payload: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            raw_payload: raw_payload.into(),
        }
    }

    /// Parse the payload as JSON
    pub fn json(&self) -> Result<Value, DecodeError> {
        serde_json::from_str(&self.raw_payload)
            .map_err(|e| DecodeError::invalid_json(&self.event_name, e))
    }
}

/// Line-oriented SSE decoder, tolerant of arbitrary chunk boundaries
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    utf8_tail: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    buffer: String,
    event_name: Option<String>,
    payload: Option<String>,
    /// Frames dropped because their payload was not valid JSON
    dropped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every frame completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.decode_utf8(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let complete: String = self.buffer.drain(..=last_newline).collect();

        // `lines` also strips the `\r` of CRLF endings
        complete
            .lines()
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    /// Flush state at end of stream.
    ///
    /// A server that closes right after its last `data:` line, without the
    /// terminating newline, still gets that frame delivered.
    pub fn finish(&mut self) -> Vec<Frame> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let rest = std::mem::take(&mut self.buffer);
        let frames = rest
            .lines()
            .filter_map(|line| self.process_line(line))
            .collect();

        self.event_name = None;
        self.payload = None;
        frames
    }

    /// Number of frames dropped so far for malformed JSON
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut pending = std::mem::take(&mut self.utf8_tail);
        pending.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let rest = pending.split_off(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(&pending));

                    match e.error_len() {
                        // Sequence cut by the chunk boundary: wait for more bytes
                        None => {
                            self.utf8_tail = rest;
                            return;
                        }
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            pending = rest.get(invalid..).unwrap_or_default().to_vec();
                        }
                    }
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
        if let Some(value) = field_value(line, "event") {
            self.event_name = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            if !value.is_empty() {
                self.payload = Some(value.to_string());
            }
        } else {
            // Blank separators, `:` comments/keep-alives, `id:` and `retry:`
            return None;
        }

        if self.event_name.is_none() || self.payload.is_none() {
            return None;
        }
        let event_name = self.event_name.take().unwrap_or_default();
        let raw_payload = self.payload.take().unwrap_or_default();

        if let Err(e) = serde_json::from_str::<IgnoredAny>(&raw_payload) {
            self.dropped += 1;
            tracing::warn!(event = %event_name, error = %e, "Dropping frame with malformed JSON payload");
            return None;
        }

        Some(Frame {
            event_name,
            raw_payload,
        })
    }
}

/// Value of a `name: value` field line, with the single optional space removed
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let value = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}
