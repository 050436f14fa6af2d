//! Generation adapter over an external LLM provider.
//!
//! # Generation Module
//!
//! The provider is a black box that turns (system, user) instructions into
//! text, either all at once or as a stream of text deltas. This module wraps
//! it in two modes:
//!
//! - **Single-shot**: [`Generator::complete`] returns the final text or a
//!   [`GenerationError`].
//! - **Incremental**: [`incremental`] yields a lazy, finite sequence of
//!   [`GenerationEvent`]s, each fragment tagged with the time elapsed since the
//!   previous one. The sequence always ends with exactly one terminal event:
//!   [`GenerationEvent::EndOfStream`] on success or
//!   [`GenerationEvent::StreamError`] on failure.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Generator`] | Provider trait (single-shot + raw delta stream) |
//! | [`GenerationRequest`] | Messages plus model parameters |
//! | [`GenerationParams`] | Model identifier, max output tokens, temperature |
//! | [`GenerationEvent`] | Tagged fragment / error / end variant |
//! | [`OpenAiGenerator`] | OpenAI-compatible chat-completions implementation |

pub mod openai;
pub mod sse;

pub use openai::OpenAiGenerator;

use crate::prompt::Prompt;
use crate::transport::TransportError;
use crate::types::Message;
use crate::BoxStream;
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Raw text deltas as produced by a provider.
pub type DeltaStream = BoxStream<'static, Result<String, GenerationError>>;

/// Provider call failures. Never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("provider returned no choices")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(TransportError::Http(e))
    }
}

/// Model parameters forwarded with every generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 400,
            temperature: 0.4,
        }
    }
}

/// One provider call: instructions plus model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(prompt: &Prompt, params: &GenerationParams) -> Self {
        Self {
            messages: prompt.messages(),
            params: params.clone(),
        }
    }
}

/// External text generator.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Single request; returns the complete, trimmed text.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Streaming request; returns raw text deltas in provider order.
    async fn stream(&self, request: &GenerationRequest) -> Result<DeltaStream, GenerationError>;

    fn name(&self) -> &'static str;
}

/// Item of an incremental generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Non-empty text with the time elapsed since the previous fragment
    /// (for the first fragment, since the request was issued).
    Fragment { text: String, elapsed: Duration },
    /// The provider failed; terminal.
    StreamError { message: String },
    /// Normal completion; terminal.
    EndOfStream,
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationEvent::Fragment { .. })
    }
}

enum IncrementalState {
    Start(Arc<dyn Generator>, GenerationRequest),
    Streaming { deltas: DeltaStream, last: Instant },
    Done,
}

/// Run `request` in incremental mode.
///
/// Nothing is sent to the provider until the returned stream is first polled.
/// The stream cannot be restarted.
pub fn incremental(
    generator: Arc<dyn Generator>,
    request: GenerationRequest,
) -> BoxStream<'static, GenerationEvent> {
    let events = stream::unfold(
        IncrementalState::Start(generator, request),
        |state| async move {
            match state {
                IncrementalState::Start(generator, request) => {
                    let started = Instant::now();
                    match generator.stream(&request).await {
                        Ok(deltas) => next_event(deltas, started).await,
                        Err(e) => {
                            warn!(generator = generator.name(), error = %e, "generation stream failed to start");
                            Some((
                                GenerationEvent::StreamError {
                                    message: e.to_string(),
                                },
                                IncrementalState::Done,
                            ))
                        }
                    }
                }
                IncrementalState::Streaming { deltas, last } => next_event(deltas, last).await,
                IncrementalState::Done => None,
            }
        },
    );
    Box::pin(events)
}

async fn next_event(
    mut deltas: DeltaStream,
    last: Instant,
) -> Option<(GenerationEvent, IncrementalState)> {
    loop {
        match deltas.next().await {
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => {
                let now = Instant::now();
                let elapsed = now.saturating_duration_since(last);
                return Some((
                    GenerationEvent::Fragment { text, elapsed },
                    IncrementalState::Streaming { deltas, last: now },
                ));
            }
            Some(Err(e)) => {
                warn!(error = %e, "generation stream failed mid-stream");
                return Some((
                    GenerationEvent::StreamError {
                        message: e.to_string(),
                    },
                    IncrementalState::Done,
                ));
            }
            None => return Some((GenerationEvent::EndOfStream, IncrementalState::Done)),
        }
    }
}
