//! In-memory explanation cache with TTL expiry and background sweeping.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKey`] | Normalized request fingerprint |
//! | [`ExplanationCache`] | Mutex-guarded store with lazy expiry and statistics |
//! | [`CacheEntry`] | Immutable explanation snapshot, optionally with pacing metadata |
//! | [`CacheSweeper`] | Periodic removal of stale entries |
//!
//! ## Lifetime
//!
//! An entry is fresh while its age is below the TTL (12 hours by default).
//! Staleness is checked lazily on [`ExplanationCache::get`] and by the sweeper
//! every interval (10 minutes by default). Entries are never mutated; a
//! regeneration replaces the entry under the same key.
//!
//! ## Example
//!
//! ```rust
//! use quranscope::cache::{CacheKey, ExplanationCache};
//! use quranscope::{ExplainLength, ExplainStyle};
//! use std::time::Duration;
//!
//! let cache = ExplanationCache::new(Duration::from_secs(12 * 3600));
//! let key = CacheKey::new(1, 1, ExplainStyle::Tldr, ExplainLength::Short);
//! cache.put(&key, "In the name of God...", None);
//! assert!(cache.get(&key).is_some());
//! ```

mod key;
mod store;
mod sweeper;

pub use key::CacheKey;
pub use store::{CacheEntry, CacheStats, ExplanationCache, Pacing, DEFAULT_TTL};
pub use sweeper::{CacheSweeper, SweeperHandle, DEFAULT_SWEEP_INTERVAL, MIN_SWEEP_INTERVAL};
