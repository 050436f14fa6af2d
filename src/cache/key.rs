//! Cache key normalization.

use crate::types::{ExplainLength, ExplainRequest, ExplainStyle};
use serde::{Deserialize, Serialize};

/// Canonical cache key: `"{surah}:{ayah}:{style}:{length}"`.
///
/// Requests that differ only in option casing, surrounding whitespace or
/// omitted options normalize to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(surah: u32, ayah: u32, style: ExplainStyle, length: ExplainLength) -> Self {
        Self(format!("{}:{}:{}:{}", surah, ayah, style, length))
    }

    /// Derive the key for a request. Total: unknown options fall back to defaults.
    pub fn from_request(req: &ExplainRequest) -> Self {
        Self::new(req.surah, req.ayah, req.style(), req.length())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&ExplainRequest> for CacheKey {
    fn from(req: &ExplainRequest) -> Self {
        Self::from_request(req)
    }
}
