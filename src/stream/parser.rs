//! Line reassembly over arbitrarily chunked input.

use super::frame::Frame;
use crate::error::FrameParseError;
use tracing::{debug, warn};

pub const DATA_MARKER: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental frame decoder owned by exactly one stream session.
///
/// Splitting happens on the raw `\n` byte, which never occurs inside a
/// multi-byte UTF-8 sequence, so characters split across chunks survive.
#[derive(Debug)]
pub struct FrameParser {
    buffer: Vec<u8>,
    max_line_bytes: usize,
    // Set while skipping the remainder of an oversized line.
    discarding: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        self.feed_bytes(chunk.as_bytes())
    }

    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            let line_len = self.buffer.len() + head.len();
            if line_len > self.max_line_bytes {
                let error = FrameParseError::LineTooLong {
                    len: line_len,
                    max: self.max_line_bytes,
                };
                warn!(%error, "Dropping oversized stream line");
                self.buffer.clear();
                continue;
            }

            self.buffer.extend_from_slice(head);
            if let Some(frame) = decode_line(&self.buffer) {
                frames.push(frame);
            }
            self.buffer.clear();
        }

        if !self.discarding {
            if self.buffer.len() + rest.len() > self.max_line_bytes {
                let error = FrameParseError::LineTooLong {
                    len: self.buffer.len() + rest.len(),
                    max: self.max_line_bytes,
                };
                warn!(%error, "Dropping oversized partial stream line");
                self.buffer.clear();
                self.discarding = true;
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }

        frames
    }

    /// Forgets any buffered fragment. Only valid between logical streams.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Bytes of the incomplete trailing line held for the next `feed`.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(line: &[u8]) -> Option<Frame> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end_matches('\r');
    let payload = text.strip_prefix(DATA_MARKER)?.trim();

    if payload == DONE_SENTINEL {
        return Some(Frame::Done);
    }
    if payload.is_empty() {
        return None;
    }
    if payload.starts_with('{') {
        return match Frame::from_event_json(payload) {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!(error = %e, "Dropping undecodable event line");
                None
            }
        };
    }

    Some(Frame::Content(payload.to_string()))
}
