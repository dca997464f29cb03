// ABOUTME: Generation stream for the deckgen application
// ABOUTME: Pulls model events, yields progress text and accumulates content and token usage

use crate::errors::{DeckError, Result};
use crate::provider::{StreamEvent, TokenUsage, UsageSemantics};
use crate::sse::BoxEventStream;
use futures_util::StreamExt;
use log::debug;

/// Progress text is held back until it passes this many bytes or closes a
/// JSON object.
pub const PROGRESS_FLUSH_BYTES: usize = 50;

/// Running token counts for one generation, combined per the provider's
/// usage convention.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    semantics: UsageSemantics,
    input_tokens: u64,
    output_tokens: u64,
}

impl UsageTracker {
    pub fn new(semantics: UsageSemantics) -> Self {
        Self {
            semantics,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    pub fn record(&mut self, usage: &TokenUsage) {
        match self.semantics {
            UsageSemantics::Latest => {
                if let Some(input) = usage.input_tokens {
                    self.input_tokens = input;
                }
                if let Some(output) = usage.output_tokens {
                    self.output_tokens = output;
                }
            }
            UsageSemantics::Additive => {
                self.input_tokens += usage.input_tokens.unwrap_or(0);
                self.output_tokens += usage.output_tokens.unwrap_or(0);
            }
        }
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }
}

/// Re-chunks small model deltas into readable progress fragments.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    pending: String,
}

impl ChunkBuffer {
    pub fn push(&mut self, text: &str) -> Option<String> {
        self.pending.push_str(text);
        if self.pending.len() > PROGRESS_FLUSH_BYTES || self.pending.contains('}') {
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }

    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Full text and token counts of a finished stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCompletion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Single-pass reader over a provider event stream.
///
/// `next_chunk` yields progress fragments until the provider signals
/// completion; `finish` drains whatever is left and hands back the
/// accumulated content. Nothing is replayed.
pub struct GenerationStream {
    events: BoxEventStream<StreamEvent>,
    usage: UsageTracker,
    content: String,
    buffer: ChunkBuffer,
    done: bool,
    failed: bool,
}

impl GenerationStream {
    pub fn new(events: BoxEventStream<StreamEvent>, semantics: UsageSemantics) -> Self {
        Self {
            events,
            usage: UsageTracker::new(semantics),
            content: String::new(),
            buffer: ChunkBuffer::default(),
            done: false,
            failed: false,
        }
    }

    /// Next progress fragment, or `None` once the stream has ended.
    pub async fn next_chunk(&mut self) -> Result<Option<String>> {
        if self.failed {
            return Err(DeckError::TransportError(
                "model stream already failed".to_string(),
            ));
        }

        while !self.done {
            match self.events.next().await {
                Some(Ok(StreamEvent::TextDelta(text))) => {
                    self.content.push_str(&text);
                    if let Some(chunk) = self.buffer.push(&text) {
                        return Ok(Some(chunk));
                    }
                }
                Some(Ok(StreamEvent::Usage(usage))) => self.usage.record(&usage),
                Some(Ok(StreamEvent::Done)) | None => self.done = true,
                Some(Err(e)) => {
                    self.done = true;
                    self.failed = true;
                    return Err(e);
                }
            }
        }

        Ok(self.buffer.flush())
    }

    /// Drain the stream and return the accumulated content and usage.
    pub async fn finish(mut self) -> Result<StreamCompletion> {
        while self.next_chunk().await?.is_some() {}

        debug!(
            "Model stream finished: {} bytes, {} input / {} output tokens",
            self.content.len(),
            self.usage.input_tokens(),
            self.usage.output_tokens()
        );

        Ok(StreamCompletion {
            content: self.content,
            input_tokens: self.usage.input_tokens(),
            output_tokens: self.usage.output_tokens(),
        })
    }
}
