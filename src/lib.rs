//! # quranscope
//!
//! Verse explanation service backed by an external LLM provider, with a
//! replay-faithful streaming cache.
//!
//! ## Overview
//!
//! Given a scripture reference, its text and a translation, the service
//! returns a natural-language explanation. Explanations are deduplicated by a
//! normalized key and kept in memory for a fixed TTL. Streaming consumers of a
//! cached explanation receive it with the same fragment boundaries and
//! inter-fragment pacing as the original generation, so a cached reply is
//! typed out exactly like a live one.
//!
//! ## Request Flow
//!
//! ```text
//! request → CacheKey → ExplanationCache lookup
//!              │
//!              ├─ hit  → ReplayPlan (timed | fallback) → consumer
//!              └─ miss → PromptBuilder → Generator (incremental)
//!                           → live bridge → consumer
//!                                   └────→ ExplanationCache::put
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Request/response types, style and length options, cache disposition |
//! | [`cache`] | Key normalization, the TTL store and its background sweeper |
//! | [`prompt`] | Deterministic prompt construction per style/length |
//! | [`generation`] | Generator trait, incremental adapter, OpenAI-compatible generator |
//! | [`replay`] | Timed, fallback and live streaming replay |
//! | [`service`] | Single-shot and streaming orchestration |
//! | [`server`] | axum HTTP boundary |
//! | [`config`] | Layered service configuration |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quranscope::{ExplainRequest, ExplainService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> quranscope::Result<()> {
//!     let config = ServiceConfig::load()?;
//!     let service = ExplainService::from_config(&config)?;
//!
//!     let req: ExplainRequest = serde_json::from_str(
//!         r#"{"surah": 1, "ayah": 1, "text": "...", "translation": "..."}"#,
//!     )?;
//!     let explanation = service.explain(&req, false).await;
//!     println!("{} ({})", explanation.response.explanation, explanation.status);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod generation;
pub mod prompt;
pub mod replay;
pub mod server;
pub mod service;
pub mod transport;
pub mod types;

pub use cache::{CacheKey, CacheStats, ExplanationCache};
pub use config::ServiceConfig;
pub use generation::{GenerationError, GenerationEvent, Generator};
pub use service::{ExplainService, Explanation, ExplanationStream};
pub use types::{
    CacheStatus, ExplainLength, ExplainOptions, ExplainRequest, ExplainResponse, ExplainStyle,
    ExplanationChunk,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream of items
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
