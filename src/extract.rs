use std::time::Duration;

use crate::chunker::Chunk;
use crate::ir::{DatasetInfo, TermCandidate};
use crate::models::ExtractionBackend;
use crate::pipeline::prompts::build_extraction_prompt;

/// Bounded retry with exponential backoff for one chunk.
///
/// Retry N (0-based) waits `base_delay * 2^N` before re-attempting, so the
/// defaults give ~1s and ~2s between the three attempts.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry)
    }
}

/// Structured diagnostics emitted while a run progresses. Synchronous and
/// fire-and-forget; the callback must not block.
#[derive(Clone, Debug)]
pub enum ExtractEvent {
    ChunkStarted {
        index: usize,
        total: usize,
        units: usize,
    },
    AttemptFailed {
        index: usize,
        attempt: u32,
        reason: String,
        backoff: Duration,
    },
    ChunkExtracted {
        index: usize,
        candidates: usize,
        attempts: u32,
    },
    ChunkFailed {
        index: usize,
        attempts: u32,
        reason: String,
    },
    /// Overall progress in [0, 100], monotonically non-decreasing, emitted
    /// after every chunk whether it succeeded or failed.
    Progress { percent: u8 },
}

/// Outcome of one chunk: candidates on success, an empty contribution plus
/// `failed` after exhausting retries. Never fatal to the run.
#[derive(Clone, Debug)]
pub struct ChunkOutcome {
    pub candidates: Vec<TermCandidate>,
    pub failed: bool,
    pub attempts: u32,
}

/// Drives one chunk: prompt, extraction call, bounded retry.
///
/// A successful call with zero pairs counts as a failed attempt while retries
/// remain; if the final attempt still yields nothing (or errors), the chunk is
/// marked failed and the run moves on.
pub fn process_chunk(
    backend: &dyn ExtractionBackend,
    chunk: Chunk<'_>,
    index: usize,
    total: usize,
    dataset: &DatasetInfo,
    template: &str,
    policy: &RetryPolicy,
    on_event: &mut dyn FnMut(ExtractEvent),
) -> ChunkOutcome {
    on_event(ExtractEvent::ChunkStarted {
        index,
        total,
        units: chunk.len(),
    });

    let prompt = build_extraction_prompt(chunk, dataset, template);
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let reason = match backend.extract_terms(&prompt) {
            Ok(candidates) if !candidates.is_empty() => {
                on_event(ExtractEvent::ChunkExtracted {
                    index,
                    candidates: candidates.len(),
                    attempts,
                });
                return ChunkOutcome {
                    candidates,
                    failed: false,
                    attempts,
                };
            }
            Ok(_) => "empty result".to_string(),
            Err(err) => format!("{err:#}"),
        };

        let retries_used = attempts - 1;
        if retries_used >= policy.max_retries {
            on_event(ExtractEvent::ChunkFailed {
                index,
                attempts,
                reason,
            });
            return ChunkOutcome {
                candidates: Vec::new(),
                failed: true,
                attempts,
            };
        }

        let backoff = policy.backoff(retries_used);
        on_event(ExtractEvent::AttemptFailed {
            index,
            attempt: attempts,
            reason,
            backoff,
        });
        std::thread::sleep(backoff);
    }
}
