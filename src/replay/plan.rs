//! Replay of cached entries.

use super::ReplayConfig;
use crate::cache::{CacheEntry, Pacing};
use crate::types::ExplanationChunk;
use crate::BoxStream;
use futures::{stream, StreamExt};
use std::time::Duration;

/// One emission: wait `wait`, then emit `text` (nothing if empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub wait: Duration,
    pub text: String,
}

impl ReplayStep {
    fn new(wait: Duration, text: impl Into<String>) -> Self {
        Self {
            wait,
            text: text.into(),
        }
    }
}

/// The exact sequence of waits and text a replay will produce.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayPlan {
    steps: Vec<ReplayStep>,
}

/// Byte offset just past the first `n` chars of `s`, clamped to its length.
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

impl ReplayPlan {
    /// Reproduce recorded fragment boundaries and pacing.
    ///
    /// Fragment 0 is emitted without waiting; fragment `i >= 1` waits
    /// `delays[i]` first. Text not covered by the fragments is flushed as a
    /// final step with no delay.
    pub fn timed(text: &str, pacing: &Pacing) -> Self {
        let mut steps = Vec::with_capacity(pacing.len() + 1);
        let mut rest = text;
        for (i, (&chars, &delay)) in pacing.fragments().iter().zip(pacing.delays()).enumerate() {
            let (piece, tail) = rest.split_at(char_offset(rest, chars));
            rest = tail;
            let wait = if i == 0 { Duration::ZERO } else { delay };
            steps.push(ReplayStep::new(wait, piece));
        }
        if !rest.is_empty() {
            steps.push(ReplayStep::new(Duration::ZERO, rest));
        }
        Self { steps }
    }

    /// Re-chunk unpaced text into `chunk_chars`-sized pieces spaced by `delay`.
    pub fn fallback(text: &str, chunk_chars: usize, delay: Duration) -> Self {
        let chunk_chars = chunk_chars.max(1);
        let mut steps = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let (piece, tail) = rest.split_at(char_offset(rest, chunk_chars));
            let wait = if steps.is_empty() { Duration::ZERO } else { delay };
            steps.push(ReplayStep::new(wait, piece));
            rest = tail;
        }
        Self { steps }
    }

    /// Timed plan when the entry carries pacing, fallback plan otherwise.
    pub fn for_entry(entry: &CacheEntry, config: &ReplayConfig) -> Self {
        match entry.pacing() {
            Some(pacing) => Self::timed(entry.text(), pacing),
            None => Self::fallback(
                entry.text(),
                config.fallback_chunk_chars,
                config.fallback_delay,
            ),
        }
    }

    pub fn steps(&self) -> &[ReplayStep] {
        &self.steps
    }

    /// Concatenated text of every step.
    pub fn text(&self) -> String {
        self.steps.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn total_wait(&self) -> Duration {
        self.steps.iter().map(|s| s.wait).sum()
    }
}

/// Play `plan` to a consumer: the flush marker, one suspension point, then
/// each step's wait and text in order.
pub fn play(plan: ReplayPlan) -> BoxStream<'static, ExplanationChunk> {
    let body = stream::unfold(
        (plan.steps.into_iter(), true),
        |(mut steps, first)| async move {
            if first {
                tokio::task::yield_now().await;
            }
            loop {
                let step = steps.next()?;
                if !step.wait.is_zero() {
                    tokio::time::sleep(step.wait).await;
                }
                if !step.text.is_empty() {
                    return Some((ExplanationChunk::Text(step.text), (steps, false)));
                }
            }
        },
    );
    Box::pin(stream::once(async { ExplanationChunk::Marker }).chain(body))
}
