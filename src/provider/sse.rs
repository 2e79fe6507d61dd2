//! Incremental SSE decoding for upstream provider streams.
//!
//! Upstream bytes arrive in arbitrary TCP-sized chunks; a `data:` line can
//! be split across any number of them. [`SseDecoder`] buffers raw bytes,
//! reassembles complete lines, and yields the payload of each `data:`
//! field. Non-data fields (`event:`, `id:`, `retry:`, comments) are
//! skipped.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use crate::error::{Error, Result};

/// Maximum bytes buffered while waiting for a line terminator. A line
/// longer than this is discarded rather than growing without bound.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Line-buffered decoder turning raw SSE bytes into `data:` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Set when the current line overflowed the cap; the rest of the line
    /// is dropped so its tail cannot resurface as a fresh line.
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning the payloads of all `data:` lines
    /// completed by it, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();

        for &byte in bytes {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else if let Some(payload) = data_payload(&self.buffer) {
                    payloads.push(payload);
                }
                self.buffer.clear();
            } else if self.discarding {
                continue;
            } else if self.buffer.len() >= MAX_LINE_BYTES {
                tracing::warn!(
                    len = self.buffer.len(),
                    "SSE line exceeded buffer cap, discarding until newline"
                );
                self.buffer.clear();
                self.discarding = true;
            } else {
                self.buffer.push(byte);
            }
        }

        payloads
    }

    /// Consume the decoder, yielding the payload of a trailing `data:`
    /// line that was never newline-terminated.
    pub fn finish(self) -> Option<String> {
        if self.discarding {
            return None;
        }
        data_payload(&self.buffer)
    }
}

/// Turn an upstream byte stream into a stream of `data:` payloads.
///
/// Transport failures surface once as [`Error::UpstreamStream`] and end
/// the stream; a trailing unterminated `data:` line is flushed at EOF.
pub fn payload_stream<S>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
{
    struct State {
        inner: Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>,
        decoder: Option<SseDecoder>,
        pending: VecDeque<String>,
        failed: bool,
    }

    let state = State {
        inner: Box::pin(bytes),
        decoder: Some(SseDecoder::new()),
        pending: VecDeque::new(),
        failed: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(payload) = st.pending.pop_front() {
                return Some((Ok(payload), st));
            }
            if st.failed {
                return None;
            }
            let decoder = st.decoder.as_mut()?;
            match st.inner.next().await {
                Some(Ok(chunk)) => st.pending.extend(decoder.push(&chunk)),
                Some(Err(e)) => {
                    st.failed = true;
                    return Some((Err(Error::UpstreamStream(e.to_string())), st));
                }
                None => {
                    // Upstream EOF: flush the tail, then drain pending.
                    let decoder = st.decoder.take()?;
                    st.pending.extend(decoder.finish());
                }
            }
        }
    })
}

/// Extract the payload from one complete SSE line, if it is a data field.
fn data_payload(line: &[u8]) -> Option<String> {
    let line = match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    };
    let text = std::str::from_utf8(line).ok()?;
    let rest = text.strip_prefix("data:")?;
    // One leading space after the colon is part of the field syntax.
    Some(rest.strip_prefix(' ').unwrap_or(rest).to_string())
}
