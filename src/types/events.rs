//! Consumer-facing pieces of a streamed explanation.

use std::borrow::Cow;

/// Zero-width marker emitted before any content to flush transport buffers.
pub const STREAM_MARKER: &str = "\u{200b}";

/// In-band text appended when a live generation fails mid-stream.
pub const STREAM_ERROR_SENTINEL: &str = "\n\n[stream-error]";

/// One item of an explanation stream, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplanationChunk {
    /// Flush marker; always the first item, never part of the explanation.
    Marker,
    /// A fragment of explanation text.
    Text(String),
    /// The generator failed; no further text follows.
    Error { message: String },
}

impl ExplanationChunk {
    /// Wire representation for text/plain streaming bodies.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            ExplanationChunk::Marker => Cow::Borrowed(STREAM_MARKER),
            ExplanationChunk::Text(text) => Cow::Borrowed(text.as_str()),
            ExplanationChunk::Error { .. } => Cow::Borrowed(STREAM_ERROR_SENTINEL),
        }
    }

    /// Explanation text carried by this chunk, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ExplanationChunk::Text(text) => Some(text),
            _ => None,
        }
    }
}
