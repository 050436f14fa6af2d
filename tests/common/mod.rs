//! Shared fixtures for integration tests.
#![allow(dead_code)]

use futures::{stream, StreamExt};
use quranscope::generation::{DeltaStream, GenerationError, GenerationRequest, Generator};
use quranscope::{ExplainRequest, ExplainService, ExplanationCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted provider delta: sleep `after`, then yield `item`.
#[derive(Debug, Clone)]
pub struct Step {
    pub after: Duration,
    pub item: Result<String, String>,
}

pub fn text(after_ms: u64, text: &str) -> Step {
    Step {
        after: Duration::from_millis(after_ms),
        item: Ok(text.to_string()),
    }
}

pub fn fail(after_ms: u64, message: &str) -> Step {
    Step {
        after: Duration::from_millis(after_ms),
        item: Err(message.to_string()),
    }
}

/// Generator that replays a fixed script and counts calls.
pub struct ScriptedGenerator {
    steps: Vec<Step>,
    completions: AtomicUsize,
    streams: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            completions: AtomicUsize::new(0),
            streams: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn streams(&self) -> usize {
        self.streams.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let mut out = String::new();
        for step in &self.steps {
            tokio::time::sleep(step.after).await;
            match &step.item {
                Ok(text) => out.push_str(text),
                Err(message) => return Err(GenerationError::Provider(message.clone())),
            }
        }
        Ok(out.trim().to_string())
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<DeltaStream, GenerationError> {
        self.streams.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let steps = self.steps.clone();
        Ok(Box::pin(stream::iter(steps).then(|step| async move {
            tokio::time::sleep(step.after).await;
            step.item.map_err(GenerationError::Provider)
        })))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn cache(ttl_secs: u64) -> Arc<ExplanationCache> {
    Arc::new(ExplanationCache::new(Duration::from_secs(ttl_secs)))
}

pub fn service(generator: Arc<ScriptedGenerator>) -> ExplainService {
    ExplainService::new(generator, cache(3600))
}

pub fn fatiha() -> ExplainRequest {
    ExplainRequest::new(
        1,
        1,
        "بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ",
        "In the name of Allah, the Entirely Merciful, the Especially Merciful.",
    )
}

/// Generator whose deltas are produced by a spawned task on its own clock,
/// whether or not anyone is polling the returned stream.
pub struct BackgroundGenerator {
    deltas: Vec<&'static str>,
    interval: Duration,
}

impl BackgroundGenerator {
    pub fn new(deltas: Vec<&'static str>, interval: Duration) -> Arc<Self> {
        Arc::new(Self { deltas, interval })
    }
}

#[async_trait::async_trait]
impl Generator for BackgroundGenerator {
    async fn complete(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(self.deltas.concat())
    }

    async fn stream(&self, _: &GenerationRequest) -> Result<DeltaStream, GenerationError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<String, GenerationError>>();
        let deltas = self.deltas.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            for (i, delta) in deltas.into_iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(interval).await;
                }
                if tx.send(Ok(delta.to_string())).is_err() {
                    break;
                }
            }
        });
        Ok(Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx)))
    }

    fn name(&self) -> &'static str {
        "background"
    }
}
