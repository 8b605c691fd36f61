//! Server-sent event decoding for streamed chat completions.
//!
//! The API sends one `data: {...}` line per token delta and finishes with
//! `data: [DONE]`. Network chunks do not respect line or UTF-8 boundaries, so
//! bytes are buffered until a full line is available.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::OpenAIError;

/// A single token delta from a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionChunk {
    pub delta: String,
    pub done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Line-oriented decoder over raw SSE bytes.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next decoded chunk, or `None` when no full data line is buffered.
    fn next_chunk(&mut self) -> Option<Result<ChatCompletionChunk, OpenAIError>> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(chunk) = decode_line(&line) {
                return Some(chunk);
            }
        }
        None
    }

    /// Decode whatever is left once the byte stream has ended.
    fn finish(&mut self) -> Option<Result<ChatCompletionChunk, OpenAIError>> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<ChatCompletionChunk, OpenAIError>> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            return Some(Err(OpenAIError::Parse(format!(
                "Invalid UTF-8 in stream: {}",
                e
            ))))
        }
    };

    // Blank separators and non-data fields (event:, id:, retry:) carry no tokens
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(Ok(ChatCompletionChunk {
            delta: String::new(),
            done: true,
        }));
    }

    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            let preview: String = data.chars().take(200).collect();
            return Some(Err(OpenAIError::Parse(format!(
                "Failed to parse stream chunk: {} (data: {})",
                e, preview
            ))));
        }
    };

    let delta = event
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();

    Some(Ok(ChatCompletionChunk { delta, done: false }))
}

/// Stream of token deltas from a streamed chat completion.
pub struct ChatCompletionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    decoder: SseDecoder,
    exhausted: bool,
}

impl ChatCompletionStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            decoder: SseDecoder::default(),
            exhausted: false,
        }
    }

    /// Drain the stream into the full completion text.
    ///
    /// Stops at the `[DONE]` marker or at the end of the byte stream,
    /// whichever comes first.
    pub async fn collect_text(mut self) -> Result<String, OpenAIError> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            let chunk = chunk?;
            if chunk.done {
                break;
            }
            text.push_str(&chunk.delta);
        }
        Ok(text)
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, OpenAIError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = this.decoder.next_chunk() {
                return Poll::Ready(Some(chunk));
            }
            if this.exhausted {
                return Poll::Ready(this.decoder.finish());
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.decoder.feed(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(OpenAIError::Network(e.to_string()))));
                }
                Poll::Ready(None) => this.exhausted = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
