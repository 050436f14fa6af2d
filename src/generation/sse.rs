//! Server-sent event decoding for streaming chat completions.
//!
//! Frames are split on a blank line, `data:` prefixes are stripped and the
//! stream stops on `[DONE]`. Buffering happens on raw bytes so multi-byte
//! characters split across network chunks are decoded intact.

use super::GenerationError;
use crate::BoxStream;
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::debug;

const DONE_SIGNAL: &str = "[DONE]";

fn find_frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn is_done(frame: &str) -> bool {
    let t = frame.trim();
    t == DONE_SIGNAL || t.strip_prefix("data:").map(str::trim) == Some(DONE_SIGNAL)
}

/// Payload of one frame, joining multi-line `data:` fields. `None` for
/// comments, empty frames and non-JSON payloads.
fn parse_frame(frame: &str) -> Option<Value> {
    let mut payload = String::new();
    for line in frame.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            // event:, id: and retry: fields carry nothing we need
            continue;
        };
        if !payload.is_empty() {
            payload.push('\n');
        }
        payload.push_str(data.trim_start());
    }
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str(&payload) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(error = %e, "skipping non-JSON SSE frame");
            None
        }
    }
}

/// Decode a byte stream into JSON event payloads.
pub fn decode_events(
    input: BoxStream<'static, Result<Bytes, GenerationError>>,
) -> BoxStream<'static, Result<Value, GenerationError>> {
    let events = stream::unfold(
        (Some(input), Vec::<u8>::new()),
        |(mut input, mut buf)| async move {
            loop {
                if let Some(idx) = find_frame_end(&buf) {
                    let frame_bytes: Vec<u8> = buf.drain(..idx + 2).collect();
                    let frame = String::from_utf8_lossy(&frame_bytes[..idx]).into_owned();
                    if is_done(&frame) {
                        return None;
                    }
                    if let Some(v) = parse_frame(&frame) {
                        return Some((Ok(v), (input, buf)));
                    }
                    continue;
                }

                let Some(source) = input.as_mut() else {
                    return None;
                };
                match source.next().await {
                    Some(Ok(bytes)) => {
                        buf.extend(bytes.iter().filter(|b| **b != b'\r'));
                    }
                    Some(Err(e)) => return Some((Err(e), (None, Vec::new()))),
                    None => {
                        // EOF: try the remaining buffer once
                        let rest = String::from_utf8_lossy(&buf).into_owned();
                        if is_done(&rest) {
                            return None;
                        }
                        return parse_frame(&rest).map(|v| (Ok(v), (None, Vec::new())));
                    }
                }
            }
        },
    );
    Box::pin(events)
}

/// Extract `choices[0].delta.content` text deltas from a chat-completions
/// event stream. In-band `error` objects become [`GenerationError::Provider`].
pub fn content_deltas(
    input: BoxStream<'static, Result<Bytes, GenerationError>>,
) -> BoxStream<'static, Result<String, GenerationError>> {
    let deltas = decode_events(input).filter_map(|event| async move {
        match event {
            Err(e) => Some(Err(e)),
            Ok(v) => {
                if let Some(err) = v.get("error") {
                    let message = err
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| err.to_string());
                    return Some(Err(GenerationError::Provider(message)));
                }
                v.pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                    .map(|s| Ok(s.to_string()))
            }
        }
    });
    Box::pin(deltas)
}
