//! Server-sent event decoding for streaming chat replies.
//!
//! The chat function answers with a chunked body of `data: <json>` lines,
//! terminated by `data: [DONE]`. Chunk boundaries are arbitrary: a chunk may
//! end mid-line, mid-JSON or in the middle of a UTF-8 sequence.
//! [`StreamDecoder`] reassembles lines and yields the incremental text found
//! at `choices[0].delta.content`.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use showcase_core::chat::FragmentStream;
use showcase_core::config::{ChatSettings, DEFAULT_MAX_BUFFER_BYTES, DEFAULT_MAX_FRAME_RETRIES};
use showcase_core::error::{Result, ShowcaseError};
use std::collections::VecDeque;
use std::pin::Pin;

/// Prefix of an event-data line.
pub const DATA_PREFIX: &str = "data: ";
/// Payload marking the end of the reply.
pub const DONE_SENTINEL: &str = "[DONE]";
/// JSON pointer to the incremental fragment inside a payload.
const FRAGMENT_POINTER: &str = "/choices/0/delta/content";

/// Bounds that keep a misbehaving stream from growing the buffer forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// Maximum buffered, not yet consumed text (bytes) before the stream is
    /// abandoned with `BufferOverflow`.
    pub max_buffer_bytes: usize,
    /// How many further chunk arrivals an unparseable line is retried on
    /// before it is discarded.
    pub max_frame_retries: u32,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            max_frame_retries: DEFAULT_MAX_FRAME_RETRIES,
        }
    }
}

impl From<&ChatSettings> for DecoderLimits {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            max_buffer_bytes: settings.max_buffer_bytes,
            max_frame_retries: settings.max_frame_retries,
        }
    }
}

/// Incremental decoder for the chat event stream.
///
/// Feed it chunks with [`push`](Self::push) in arrival order; each call
/// returns the fragments completed by that chunk. Call
/// [`finish`](Self::finish) when the body ends.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    limits: DecoderLimits,
    /// Decoded text not yet consumed as complete lines.
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    utf8_tail: Vec<u8>,
    /// The buffer starts with a line that failed to parse last time.
    pending_retry: bool,
    /// Failed parse attempts of the line at the buffer head.
    failed_attempts: u32,
    saw_done: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DecoderLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Whether a `[DONE]` sentinel has been seen.
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    /// Bytes of decoded text currently waiting in the buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Consumes one chunk and returns the fragments it completed, in order.
    ///
    /// # Errors
    ///
    /// Returns `BufferOverflow` when the unconsumed text exceeds
    /// `max_buffer_bytes`. Malformed frames are never an error.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.decode_utf8(chunk);
        let fragments = self.drain_lines();

        if self.buffer.len() > self.limits.max_buffer_bytes {
            tracing::warn!(
                "[StreamDecoder] Buffer grew to {} bytes (limit {}), abandoning stream",
                self.buffer.len(),
                self.limits.max_buffer_bytes
            );
            return Err(ShowcaseError::BufferOverflow {
                limit: self.limits.max_buffer_bytes,
            });
        }

        Ok(fragments)
    }

    /// Ends decoding. Unconsumed text is discarded; the discarded byte count
    /// is returned.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len() + self.utf8_tail.len();
        self.buffer.clear();
        self.utf8_tail.clear();
        self.pending_retry = false;
        self.failed_attempts = 0;
        discarded
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    self.buffer
                        .push_str(std::str::from_utf8(&input[..valid]).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + len..];
                        }
                        None => {
                            // Sequence continues in the next chunk
                            self.utf8_tail = input[valid..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut fragments = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            let retrying = std::mem::take(&mut self.pending_retry);

            if line.starts_with(':') || line.trim().is_empty() {
                continue;
            }
            let Some(payload) = line.strip_prefix(DATA_PREFIX).map(str::trim) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                self.saw_done = true;
                self.failed_attempts = 0;
                break;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(value) => {
                    self.failed_attempts = 0;
                    if let Some(fragment) = extract_fragment(&value) {
                        fragments.push(fragment);
                    }
                }
                Err(err) => {
                    self.failed_attempts = if retrying {
                        self.failed_attempts + 1
                    } else {
                        1
                    };

                    if self.failed_attempts > self.limits.max_frame_retries {
                        tracing::debug!(
                            "[StreamDecoder] Skipping malformed frame after {} attempts: {}",
                            self.failed_attempts,
                            err
                        );
                        self.failed_attempts = 0;
                        continue;
                    }

                    // Put the line back and wait for more bytes
                    self.buffer.insert(0, '\n');
                    self.buffer.insert_str(0, &line);
                    self.pending_retry = true;
                    break;
                }
            }
        }

        fragments
    }
}

/// Returns the non-empty fragment of a parsed payload, if any.
fn extract_fragment(value: &Value) -> Option<String> {
    value
        .pointer(FRAGMENT_POINTER)
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Adapts a chunked response body into a [`FragmentStream`].
///
/// Body errors become `Transport` failures and end the stream, as does a
/// decoder overflow. When the body ends, leftover buffered text is dropped.
pub fn fragment_stream<S, B, E>(body: S, decoder: StreamDecoder) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder,
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.ready.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => match state.decoder.push(chunk.as_ref()) {
                    Ok(fragments) => state.ready.extend(fragments),
                    Err(err) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                },
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((
                        Err(ShowcaseError::transport(format!("Stream aborted: {}", err))),
                        state,
                    ));
                }
                None => {
                    let discarded = state.decoder.finish();
                    if discarded > 0 {
                        tracing::debug!(
                            "[StreamDecoder] Discarded {} unconsumed bytes at end of stream",
                            discarded
                        );
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: StreamDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    fn decode_all(decoder: &mut StreamDecoder, chunks: &[&[u8]]) -> Vec<String> {
        chunks
            .iter()
            .flat_map(|chunk| decoder.push(chunk).unwrap())
            .collect()
    }

    #[test]
    fn test_hello_scenario() {
        let mut decoder = StreamDecoder::new();

        let first = decoder
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n")
            .unwrap();
        let second = decoder
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n")
            .unwrap();
        let third = decoder.push(b"data: [DONE]\n").unwrap();

        assert_eq!(first, vec!["Hel"]);
        assert_eq!(second, vec!["lo"]);
        assert!(third.is_empty());
        assert!(decoder.saw_done());
        assert_eq!([first, second].concat().concat(), "Hello");
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let body = [
            ": keep-alive\n".to_string(),
            frame("Grüße, "),
            "\n".to_string(),
            "event: ping\n".to_string(),
            frame("wörld 🌍"),
            "data: {\"choices\":[{\"delta\":{}}]}\r\n".to_string(),
            frame("!"),
            "data: [DONE]\n".to_string(),
        ]
        .concat();
        let bytes = body.as_bytes();

        let expected = decode_all(&mut StreamDecoder::new(), &[bytes]);
        assert_eq!(expected, vec!["Grüße, ", "wörld 🌍", "!"]);

        for split in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(split);
            let got = decode_all(&mut StreamDecoder::new(), &[head, tail]);
            assert_eq!(got, expected, "split at byte {}", split);
        }

        let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&mut StreamDecoder::new(), &single_bytes), expected);
    }

    #[test]
    fn test_payload_split_mid_object() {
        let mut decoder = StreamDecoder::new();

        assert!(
            decoder
                .push(b"data: {\"choices\":[{\"delta\":{\"cont")
                .unwrap()
                .is_empty()
        );
        let fragments = decoder.push(b"ent\":\"split\"}}]}\n").unwrap();

        assert_eq!(fragments, vec!["split"]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_utf8_sequence_split_across_chunks() {
        let line = frame("é");
        let bytes = line.as_bytes();
        let pos = line.find('é').unwrap() + 1; // inside the two-byte sequence

        let mut decoder = StreamDecoder::new();
        assert!(decoder.push(&bytes[..pos]).unwrap().is_empty());
        assert_eq!(decoder.push(&bytes[pos..]).unwrap(), vec!["é"]);
    }

    #[test]
    fn test_malformed_lines_never_emit() {
        let mut decoder = StreamDecoder::new();

        assert!(decoder.push(b"data: {not json\n").unwrap().is_empty());
        assert!(decoder.push(b"data: {not json}\n").unwrap().is_empty());
        decoder.finish();
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_malformed_line_is_pushed_back_unmodified() {
        let mut decoder = StreamDecoder::new();

        decoder.push(b"data: {oops\r\n").unwrap();

        assert_eq!(decoder.buffered_len(), "data: {oops\n".len());
    }

    #[test]
    fn test_retry_bound_lets_later_frames_through() {
        let mut decoder = StreamDecoder::with_limits(DecoderLimits {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            max_frame_retries: 2,
        });

        assert!(decoder.push(b"data: {broken\n").unwrap().is_empty());
        // First retry fails, the broken line still blocks the buffer
        assert!(decoder.push(frame("a").as_bytes()).unwrap().is_empty());
        // Second retry exceeds the bound: the broken line is dropped
        let released = decoder.push(frame("b").as_bytes()).unwrap();

        assert_eq!(released, vec!["a", "b"]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_zero_retries_skips_immediately() {
        let mut decoder = StreamDecoder::with_limits(DecoderLimits {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            max_frame_retries: 0,
        });

        let body = format!("data: {{nope\n{}", frame("ok"));
        assert_eq!(decoder.push(body.as_bytes()).unwrap(), vec!["ok"]);
    }

    #[test]
    fn test_buffer_overflow_is_transport_failure() {
        let mut decoder = StreamDecoder::with_limits(DecoderLimits {
            max_buffer_bytes: 32,
            max_frame_retries: 100,
        });

        let err = decoder.push(&[b'x'; 64]).unwrap_err();

        assert_eq!(err, ShowcaseError::BufferOverflow { limit: 32 });
        assert!(err.is_transport_failure());
    }

    #[test]
    fn test_done_stops_extraction_for_chunk_only() {
        let mut decoder = StreamDecoder::new();

        let body = format!("data: [DONE]\n{}", frame("late"));
        assert!(decoder.push(body.as_bytes()).unwrap().is_empty());
        assert!(decoder.saw_done());

        // Remaining lines are picked up when more data arrives
        assert_eq!(decoder.push(b"").unwrap(), vec!["late"]);
    }

    #[test]
    fn test_ignored_lines() {
        let mut decoder = StreamDecoder::new();
        let body = ":comment\n   \nretry: 100\ndata:{\"x\":1}\ndata: {\"choices\":[]}\n";

        assert!(decoder.push(body.as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_invalid_utf8_becomes_replacement_char() {
        let mut decoder = StreamDecoder::new();
        let mut body = b"data: {\"choices\":[{\"delta\":{\"content\":\"a".to_vec();
        body.push(0xFF);
        body.extend_from_slice(b"b\"}}]}\n");

        assert_eq!(decoder.push(&body).unwrap(), vec!["a\u{FFFD}b"]);
    }

    #[tokio::test]
    async fn test_fragment_stream_reports_body_error() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(frame("one").into_bytes()),
            Err("connection reset".to_string()),
            Ok(frame("never").into_bytes()),
        ];
        let mut fragments = fragment_stream(stream::iter(chunks), StreamDecoder::new());

        assert_eq!(fragments.next().await.unwrap().unwrap(), "one");
        let err = fragments.next().await.unwrap().unwrap_err();
        assert!(err.is_transport_failure());
        assert!(fragments.next().await.is_none());
    }

    #[tokio::test]
    async fn test_fragment_stream_discards_trailing_partial_line() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(frame("whole").into_bytes()),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"half".to_vec()),
        ];
        let fragments: Vec<_> = fragment_stream(stream::iter(chunks), StreamDecoder::new())
            .collect()
            .await;

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "whole");
    }
}
