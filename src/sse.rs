// ABOUTME: Server-sent events decoding for the deckgen application
// ABOUTME: Splits a streamed HTTP body into `data:` payloads and maps them to typed events

use crate::errors::{DeckError, Result};
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

pub type BoxEventStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Incremental SSE frame splitter. Frames end with a blank line; only the
/// `data:` lines of a frame are kept.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the data payload of every completed frame.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(pos) = memchr::memmem::find(&self.buf, b"\n\n") {
            let frame: Vec<u8> = self.buf.drain(..pos + 2).collect();
            if let Some(data) = frame_data(&frame) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing frame that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let frame = std::mem::take(&mut self.buf);
        frame_data(&frame).into_iter().collect()
    }
}

fn frame_data(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

struct DecodeState<S, F, T> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    parse: F,
    pending: VecDeque<T>,
    error: Option<DeckError>,
    finished: bool,
}

/// Turn a byte stream carrying SSE into a stream of parsed events.
///
/// `parse` maps one `data:` payload to zero or more events. A transport error
/// or a parse error ends the stream after the events already decoded.
pub fn decode_stream<S, B, E, T, F>(bytes: S, parse: F) -> BoxEventStream<T>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    T: Send + 'static,
    F: FnMut(&str) -> Result<Vec<T>> + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        parse,
        pending: VecDeque::new(),
        error: None,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((Ok(item), state));
            }
            if let Some(err) = state.error.take() {
                return Some((Err(err), state));
            }
            if state.finished {
                return None;
            }

            let payloads = match state.bytes.next().await {
                Some(Ok(chunk)) => state.decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    state.error = Some(DeckError::TransportError(e.to_string()));
                    continue;
                }
                None => {
                    state.finished = true;
                    state.decoder.finish()
                }
            };

            for payload in payloads {
                match (state.parse)(&payload) {
                    Ok(items) => state.pending.extend(items),
                    Err(e) => {
                        state.finished = true;
                        state.error = Some(e);
                        break;
                    }
                }
            }
        }
    }))
}
