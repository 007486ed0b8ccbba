//! NDJSON frame decoding for streaming chat responses.
//!
//! Ollama streams one JSON object per line. HTTP chunking does not respect
//! line boundaries, so bytes are buffered until a full line is available.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use parley_core::{ChatDelta, ChatStream, TransportError};
use tracing::{trace, warn};

use super::models::OllamaChatStreamChunk;

/// Longest frame excerpt quoted in a framing error.
const MAX_ERROR_EXCERPT: usize = 120;

/// State threaded through the `unfold` stream.
struct DecodeState<S> {
    stream: S,
    buf: BytesMut,
    /// Upstream body is exhausted.
    eof: bool,
    /// A final frame or an error has been yielded; nothing more follows.
    finished: bool,
}

/// Convert a raw NDJSON byte stream into chat deltas.
///
/// The returned stream ends right after the first frame with `done: true`
/// or after the first error. A body that ends before a final frame yields
/// [`TransportError::UnexpectedEof`].
pub fn decode_chat_stream<S, E>(byte_stream: S) -> ChatStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + 'static,
{
    let state = DecodeState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        eof: false,
        finished: false,
    };

    let decoded = futures_util::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        loop {
            // Try to extract a complete line from the buffer.
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                match parse_line(&line) {
                    Some(result) => return Some(st.yield_frame(result)),
                    None => continue,
                }
            }

            if st.eof {
                // A final line without a trailing newline is still a frame.
                if !is_blank(&st.buf) {
                    let line = st.buf.split();
                    if let Some(result) = parse_line(&line) {
                        return Some(st.yield_frame(result));
                    }
                }
                st.finished = true;
                return Some((Err(TransportError::UnexpectedEof), st));
            }

            // Need more data from upstream.
            match st.stream.next().await {
                Some(Ok(chunk)) => {
                    trace!(bytes = chunk.len(), "Received stream chunk");
                    st.buf.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Upstream stream error");
                    st.finished = true;
                    return Some((Err(TransportError::Stream(e.to_string())), st));
                }
                None => st.eof = true,
            }
        }
    });

    Box::pin(decoded)
}

impl<S> DecodeState<S> {
    fn yield_frame(
        mut self,
        result: Result<ChatDelta, TransportError>,
    ) -> (Result<ChatDelta, TransportError>, Self) {
        if result.as_ref().map_or(true, |delta| delta.done) {
            self.finished = true;
        }
        (result, self)
    }
}

/// Parse one line. Blank lines yield `None`.
///
/// Invalid UTF-8 is a framing error like any other malformed JSON.
fn parse_line(line: &[u8]) -> Option<Result<ChatDelta, TransportError>> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }

    let chunk: OllamaChatStreamChunk = match serde_json::from_slice(trimmed) {
        Ok(chunk) => chunk,
        Err(e) => {
            let text = String::from_utf8_lossy(trimmed);
            return Some(Err(TransportError::Framing(format!(
                "{e} in {:?}",
                excerpt(&text)
            ))));
        }
    };

    if let Some(message) = chunk.error {
        return Some(Err(TransportError::Server(message)));
    }

    Some(Ok(ChatDelta {
        content: chunk.message.map(|m| m.content).unwrap_or_default(),
        done: chunk.done,
    }))
}

/// Find the next newline in the buffer, returning the position after it.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

fn is_blank(buf: &BytesMut) -> bool {
    buf.iter().all(u8::is_ascii_whitespace)
}

fn excerpt(text: &str) -> String {
    text.chars().take(MAX_ERROR_EXCERPT).collect()
}
