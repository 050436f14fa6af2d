//! Streaming replay engine.
//!
//! # Replay Module
//!
//! Every explanation stream starts with [`ExplanationChunk::Marker`] and then
//! takes one of three paths:
//!
//! ```text
//!               ┌─ entry with pacing ──→ ReplayPlan::timed    ─┐
//! LOOKUP ─ hit ─┤                                              ├─→ play() ─→ consumer
//!    │          └─ entry without pacing → ReplayPlan::fallback ┘
//!    │
//!    └── miss / bypass ─→ live(): worker task ── bounded channel ──→ consumer
//!                                    └──→ PacingRecorder ──→ ExplanationCache::put
//! ```
//!
//! Replays work on the `Arc<CacheEntry>` snapshot taken at lookup, so an
//! overwrite or sweep of the same key never disturbs a replay in progress.
//! Fragments are always delivered in capture order; delays are best effort.
//!
//! [`ExplanationChunk::Marker`]: crate::types::ExplanationChunk::Marker

mod live;
mod plan;

pub use live::{live, PacingRecorder};
pub use plan::{play, ReplayPlan, ReplayStep};

use std::time::Duration;

/// Default fallback chunk size, in chars.
pub const DEFAULT_FALLBACK_CHUNK_CHARS: usize = 48;

/// Default synthetic delay between fallback chunks.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(15);

/// Default capacity of the live hand-off channel.
pub const DEFAULT_LIVE_BUFFER: usize = 64;

/// Tuning for the replay paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Chunk size used when an entry carries no pacing metadata.
    pub fallback_chunk_chars: usize,
    /// Fixed delay between fallback chunks.
    pub fallback_delay: Duration,
    /// Bounded queue capacity between the generation worker and the consumer.
    pub live_buffer: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            fallback_chunk_chars: DEFAULT_FALLBACK_CHUNK_CHARS,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            live_buffer: DEFAULT_LIVE_BUFFER,
        }
    }
}
