//! Explanation store.

use super::key::CacheKey;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default entry lifetime: 12 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Fragment boundaries and inter-fragment delays captured from a live generation.
///
/// `delays[i]` is the wait observed before `fragments[i]` was produced.
/// Fragment lengths count chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    fragments: Vec<usize>,
    delays: Vec<Duration>,
}

impl Pacing {
    /// Returns `None` unless both sequences have the same length.
    pub fn new(fragments: Vec<usize>, delays: Vec<Duration>) -> Option<Self> {
        if fragments.len() != delays.len() {
            return None;
        }
        Some(Self { fragments, delays })
    }

    pub fn fragments(&self) -> &[usize] {
        &self.fragments
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Total chars covered by the recorded fragments.
    pub fn total_chars(&self) -> usize {
        self.fragments.iter().sum()
    }
}

/// An immutable cached explanation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    text: String,
    created_at: Instant,
    pacing: Option<Pacing>,
}

impl CacheEntry {
    fn new(text: String, pacing: Option<Pacing>, created_at: Instant) -> Self {
        Self {
            text,
            created_at,
            pacing,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Present only for entries produced by incremental generation.
    pub fn pacing(&self) -> Option<&Pacing> {
        self.pacing.as_ref()
    }

    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) < ttl
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

/// In-memory explanation cache.
///
/// Every read and write (including sweeps) goes through one mutex. Lookups
/// hand out `Arc` snapshots, so a replay in progress is unaffected by a later
/// overwrite or eviction of the same key.
pub struct ExplanationCache {
    entries: Mutex<HashMap<CacheKey, Arc<CacheEntry>>>,
    ttl: Duration,
    stats: AtomicStats,
}

impl ExplanationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            stats: AtomicStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any. A stale entry found here is removed.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<CacheEntry>> {
        let mut entries = self.lock();
        let fresh = match entries.get(key) {
            None => None,
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.clone()),
            Some(_) => {
                entries.remove(key);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache entry expired on lookup");
                None
            }
        };
        drop(entries);

        if fresh.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    /// Insert or overwrite the entry for `key` with a fresh timestamp.
    pub fn put(&self, key: &CacheKey, text: impl Into<String>, pacing: Option<Pacing>) {
        let entry = Arc::new(CacheEntry::new(text.into(), pacing, Instant::now()));
        debug!(
            key = %key,
            chars = entry.text.chars().count(),
            fragments = entry.pacing.as_ref().map(Pacing::len),
            "cache put"
        );
        self.lock().insert(key.clone(), entry);
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove every entry that is no longer fresh. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now, ttl));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "cache sweep");
        }
        removed
    }

    /// Number of stored entries, stale ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            sets: self.stats.sets.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<CacheEntry>>> {
        // Entries are replaced wholesale, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ExplanationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
