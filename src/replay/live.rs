//! Live generation bridged to a consumer while its pacing is recorded.

use crate::cache::{CacheKey, ExplanationCache, Pacing};
use crate::generation::{incremental, GenerationEvent, GenerationRequest, Generator};
use crate::types::ExplanationChunk;
use crate::BoxStream;
use futures::{future, stream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info_span, warn, Instrument};

/// Accumulates fragment text, char lengths and delays of a live generation.
#[derive(Debug, Default)]
pub struct PacingRecorder {
    text: String,
    fragments: Vec<usize>,
    delays: Vec<Duration>,
}

impl PacingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fragment: &str, elapsed: Duration) {
        self.text.push_str(fragment);
        self.fragments.push(fragment.chars().count());
        self.delays.push(elapsed);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trimmed text and its pacing, or `None` when nothing but whitespace was
    /// produced.
    ///
    /// Whitespace removed by trimming is taken off the leading and trailing
    /// fragments so that fragment lengths still sum to the stored text.
    pub fn finish(self) -> Option<(String, Pacing)> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let leading = self.text.chars().take_while(|c| c.is_whitespace()).count();
        let trailing = self.text.chars().rev().take_while(|c| c.is_whitespace()).count();

        let mut fragments = self.fragments;
        shave(fragments.iter_mut(), leading);
        shave(fragments.iter_mut().rev(), trailing);

        Pacing::new(fragments, self.delays).map(|pacing| (trimmed.to_string(), pacing))
    }
}

fn shave<'a>(fragments: impl Iterator<Item = &'a mut usize>, mut chars: usize) {
    for len in fragments {
        if chars == 0 {
            break;
        }
        let cut = (*len).min(chars);
        *len -= cut;
        chars -= cut;
    }
}

/// Start a live generation for `key` and stream it to the caller.
///
/// The provider call runs in its own task, independent of the returned
/// stream, and is never held back by a slow consumer: fragments are timed as
/// the provider yields them and handed over through a bounded channel of
/// `buffer` slots. If the consumer goes away the task keeps draining the
/// provider so the result is still cached. Non-empty output, including the
/// partial output of a failed generation, is written to `cache` before the
/// stream ends.
///
/// Must be called within a tokio runtime.
pub fn live(
    generator: Arc<dyn Generator>,
    request: GenerationRequest,
    cache: Arc<ExplanationCache>,
    key: CacheKey,
    buffer: usize,
) -> BoxStream<'static, ExplanationChunk> {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let span = info_span!(
        "live_generation",
        request_id = %uuid::Uuid::new_v4(),
        key = %key,
        generator = generator.name(),
    );
    tokio::spawn(relay(incremental(generator, request), tx, cache, key).instrument(span));

    let body = ReceiverStream::new(rx)
        .take_while(|event| future::ready(*event != GenerationEvent::EndOfStream))
        .filter_map(|event| async move {
            tokio::task::yield_now().await;
            match event {
                GenerationEvent::Fragment { text, .. } => Some(ExplanationChunk::Text(text)),
                GenerationEvent::StreamError { message } => Some(ExplanationChunk::Error { message }),
                GenerationEvent::EndOfStream => None,
            }
        });
    Box::pin(stream::once(async { ExplanationChunk::Marker }).chain(body))
}

/// Drain the provider while forwarding to the consumer.
///
/// The provider is polled independently of consumer backpressure: events
/// wait in `backlog` until the bounded channel has room, so recorded delays
/// reflect generation timing only. The entry is cached as soon as the
/// provider finishes, ahead of the terminal event in the backlog.
async fn relay(
    mut events: BoxStream<'static, GenerationEvent>,
    tx: mpsc::Sender<GenerationEvent>,
    cache: Arc<ExplanationCache>,
    key: CacheKey,
) {
    let mut recorder = PacingRecorder::new();
    let mut backlog: VecDeque<GenerationEvent> = VecDeque::new();
    let mut attached = true;
    let mut finished = false;

    loop {
        tokio::select! {
            biased;
            event = events.next(), if !finished => {
                let event = event.unwrap_or(GenerationEvent::EndOfStream);
                match &event {
                    GenerationEvent::Fragment { text, elapsed } => recorder.record(text, *elapsed),
                    GenerationEvent::StreamError { message } => {
                        warn!(%message, partial_chars = recorder.text().chars().count(), "live generation failed");
                    }
                    GenerationEvent::EndOfStream => {}
                }
                if event.is_terminal() {
                    finished = true;
                    persist(std::mem::take(&mut recorder), &cache, &key);
                }
                if attached {
                    backlog.push_back(event);
                }
            }
            permit = tx.reserve(), if attached && !backlog.is_empty() => match permit {
                Ok(permit) => {
                    if let Some(event) = backlog.pop_front() {
                        permit.send(event);
                    }
                }
                Err(_) => {
                    debug!("consumer disconnected; draining generation");
                    attached = false;
                    backlog.clear();
                }
            },
            else => break,
        }
    }
}

fn persist(recorder: PacingRecorder, cache: &ExplanationCache, key: &CacheKey) {
    match recorder.finish() {
        Some((text, pacing)) => {
            debug!(chars = text.chars().count(), fragments = pacing.len(), "caching live generation");
            cache.put(key, text, Some(pacing));
        }
        None => debug!("live generation produced no text; not cached"),
    }
}
