//! Core boundary types for the explanation service.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExplainRequest`] | Incoming verse + translation + options |
//! | [`ExplainResponse`] | Single-shot response body |
//! | [`ExplainStyle`] / [`ExplainLength`] | Parsed, defaulted option values |
//! | [`CacheStatus`] | Cache disposition reported to callers |
//! | [`ExplanationChunk`] | One piece of a streamed explanation |
//! | [`Message`] | Chat message sent to the generator |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Request/response bodies and cache disposition |
//! | [`options`] | Style and length parsing |
//! | [`events`] | Consumer-facing stream chunks |
//! | [`message`] | Generator chat messages |

pub mod events;
pub mod message;
pub mod options;
pub mod request;

pub use events::{ExplanationChunk, STREAM_ERROR_SENTINEL, STREAM_MARKER};
pub use message::{Message, MessageRole};
pub use options::{ExplainLength, ExplainStyle};
pub use request::{CacheStatus, ExplainOptions, ExplainRequest, ExplainResponse};
