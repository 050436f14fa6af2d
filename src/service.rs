//! Request orchestration for both endpoints.
//!
//! [`ExplainService`] ties key normalization, the cache, prompt construction,
//! the generator and the replay engine together and decides the
//! [`CacheStatus`] of every request. Generation failures never escape: the
//! single-shot path degrades to a placeholder and the streaming path carries
//! an in-band error chunk.

use crate::cache::{CacheKey, ExplanationCache};
use crate::config::ServiceConfig;
use crate::generation::{GenerationParams, GenerationRequest, Generator, OpenAiGenerator};
use crate::prompt::PromptBuilder;
use crate::replay::{self, ReplayConfig, ReplayPlan};
use crate::transport::HttpTransport;
use crate::types::{CacheStatus, ExplainRequest, ExplainResponse, ExplanationChunk};
use crate::BoxStream;
use std::sync::Arc;
use tracing::{debug, error};

/// Explanation returned by the single-shot path when generation fails.
pub const FAILURE_PLACEHOLDER: &str = "Failed to generate explanation.";

/// Result of a single-shot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub response: ExplainResponse,
    pub status: CacheStatus,
}

impl Explanation {
    fn new(explanation: impl Into<String>, status: CacheStatus) -> Self {
        Self {
            response: ExplainResponse {
                explanation: explanation.into(),
                cached: status == CacheStatus::Hit,
            },
            status,
        }
    }
}

/// A streaming explanation plus the metadata reported alongside it.
pub struct ExplanationStream {
    pub key: CacheKey,
    pub status: CacheStatus,
    /// Whether the cache was skipped for this request.
    pub bypass: bool,
    pub chunks: BoxStream<'static, ExplanationChunk>,
}

pub struct ExplainService {
    cache: Arc<ExplanationCache>,
    generator: Arc<dyn Generator>,
    prompts: PromptBuilder,
    params: GenerationParams,
    replay: ReplayConfig,
}

impl ExplainService {
    pub fn new(generator: Arc<dyn Generator>, cache: Arc<ExplanationCache>) -> Self {
        Self {
            cache,
            generator,
            prompts: PromptBuilder::new(),
            params: GenerationParams::default(),
            replay: ReplayConfig::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_replay_config(mut self, replay: ReplayConfig) -> Self {
        self.replay = replay;
        self
    }

    /// Wire an OpenAI-compatible generator and a fresh cache from `config`.
    pub fn from_config(config: &ServiceConfig) -> crate::Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(
            config.openai_base_url.as_str(),
            config.api_key().map(str::to_string),
            config.http_timeout(),
        )?;
        let generator = Arc::new(OpenAiGenerator::new(transport));
        let cache = Arc::new(ExplanationCache::new(config.cache_ttl()));
        Ok(Self::new(generator, cache)
            .with_params(config.generation_params())
            .with_replay_config(config.replay_config()))
    }

    pub fn cache(&self) -> &Arc<ExplanationCache> {
        &self.cache
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    fn generation_request(&self, req: &ExplainRequest) -> GenerationRequest {
        GenerationRequest::new(&self.prompts.build(req), &self.params)
    }

    /// Single-shot explanation.
    ///
    /// `bypass`, like `req.regenerate`, skips the cache lookup; the fresh
    /// result still overwrites the entry.
    pub async fn explain(&self, req: &ExplainRequest, bypass: bool) -> Explanation {
        let bypass = bypass || req.regenerate;
        let key = CacheKey::from_request(req);

        if !bypass {
            if let Some(entry) = self.cache.get(&key) {
                debug!(key = %key, "serving cached explanation");
                return Explanation::new(entry.text(), CacheStatus::Hit);
            }
        }

        match self.generator.complete(&self.generation_request(req)).await {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    self.cache.put(&key, text, None);
                }
                Explanation::new(text, CacheStatus::generated(bypass))
            }
            Err(e) => {
                error!(key = %key, generator = self.generator.name(), error = %e, "explanation generation failed");
                Explanation::new(FAILURE_PLACEHOLDER, CacheStatus::Bypass)
            }
        }
    }

    /// Streaming explanation.
    ///
    /// A fresh entry is replayed with its recorded pacing (or the fallback
    /// pacing when it has none); otherwise a live generation starts
    /// immediately and is cached when it finishes. Must be called within a
    /// tokio runtime.
    pub fn explain_stream(&self, req: &ExplainRequest, bypass: bool) -> ExplanationStream {
        let bypass = bypass || req.regenerate;
        let key = CacheKey::from_request(req);

        if !bypass {
            if let Some(entry) = self.cache.get(&key) {
                debug!(key = %key, timed = entry.pacing().is_some(), "replaying cached explanation");
                let plan = ReplayPlan::for_entry(&entry, &self.replay);
                return ExplanationStream {
                    key,
                    status: CacheStatus::Hit,
                    bypass,
                    chunks: replay::play(plan),
                };
            }
        }

        let chunks = replay::live(
            Arc::clone(&self.generator),
            self.generation_request(req),
            Arc::clone(&self.cache),
            key.clone(),
            self.replay.live_buffer,
        );
        ExplanationStream {
            key,
            status: CacheStatus::generated(bypass),
            bypass,
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{DeltaStream, GenerationError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixed {
        reply: Result<&'static str, u16>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(reply: Result<&'static str, u16>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl Generator for Fixed {
        async fn complete(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .map_err(|status| GenerationError::Status {
                    status,
                    body: String::new(),
                })
        }

        async fn stream(&self, _: &GenerationRequest) -> Result<DeltaStream, GenerationError> {
            Err(GenerationError::EmptyResponse)
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn service(generator: Arc<Fixed>) -> ExplainService {
        ExplainService::new(generator, Arc::new(ExplanationCache::new(Duration::from_secs(60))))
    }

    fn req() -> ExplainRequest {
        ExplainRequest::new(1, 1, "text", "translation")
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let gen = Fixed::new(Ok("  An explanation.\n"));
        let svc = service(gen.clone());

        let first = svc.explain(&req(), false).await;
        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(first.response.explanation, "An explanation.");
        assert!(!first.response.cached);

        let second = svc.explain(&req(), false).await;
        assert_eq!(second.status, CacheStatus::Hit);
        assert!(second.response.cached);
        assert_eq!(second.response.explanation, "An explanation.");
        assert_eq!(gen.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bypass_skips_lookup_but_refreshes_entry() {
        let gen = Fixed::new(Ok("fresh"));
        let svc = service(gen.clone());
        svc.cache().put(&CacheKey::from_request(&req()), "stale", None);

        let out = svc.explain(&req(), true).await;
        assert_eq!(out.status, CacheStatus::BypassNew);
        assert_eq!(out.response.explanation, "fresh");

        let regenerated = svc.explain(&req().regenerate(), false).await;
        assert_eq!(regenerated.status, CacheStatus::BypassNew);
        assert_eq!(gen.calls.load(Ordering::SeqCst), 2);

        let hit = svc.explain(&req(), false).await;
        assert_eq!(hit.response.explanation, "fresh");
    }

    #[tokio::test]
    async fn failure_returns_placeholder_and_caches_nothing() {
        let svc = service(Fixed::new(Err(500)));
        let out = svc.explain(&req(), false).await;
        assert_eq!(out.status, CacheStatus::Bypass);
        assert_eq!(out.response.explanation, FAILURE_PLACEHOLDER);
        assert!(!out.response.cached);
        assert!(svc.cache().is_empty());
    }

    #[tokio::test]
    async fn empty_result_is_returned_but_not_cached() {
        let svc = service(Fixed::new(Ok("   ")));
        let out = svc.explain(&req(), false).await;
        assert_eq!(out.status, CacheStatus::Miss);
        assert_eq!(out.response.explanation, "");
        assert!(svc.cache().is_empty());
    }

    #[tokio::test]
    async fn options_share_normalized_entry() {
        let gen = Fixed::new(Ok("tldr text"));
        let svc = service(gen.clone());
        svc.explain(&req().with_style(" TLDR "), false).await;
        let out = svc.explain(&req().with_style("tldr").with_length("short"), false).await;
        assert_eq!(out.status, CacheStatus::Hit);
        assert_eq!(gen.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn from_config_requires_api_key() {
        assert!(ExplainService::from_config(&ServiceConfig::default()).is_err());
    }
}
