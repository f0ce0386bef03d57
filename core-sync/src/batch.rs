//! # Bounded Batch Utility
//!
//! Apply an async operation to items in fixed-size chunks: one call per
//! chunk, a short delay between chunks, per-chunk outcome collection, and
//! continuation past partial failure. Cancellation is observed between
//! chunks; outcomes already collected are kept.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Chunking parameters.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Items per chunk. Clamped to at least 1.
    pub chunk_size: usize,
    /// Pause inserted before every chunk after the first.
    pub delay_between_chunks: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            delay_between_chunks: Duration::from_millis(250),
        }
    }
}

/// Outcome of one chunk.
#[derive(Debug, Clone)]
pub enum ChunkOutcome<R> {
    /// The operation returned; `result` is its value.
    Completed {
        index: usize,
        items: usize,
        result: R,
    },
    /// The operation errored; the whole chunk's fate is unknown and callers
    /// treat every item in it as failed.
    Failed {
        index: usize,
        items: usize,
        error: String,
    },
}

/// All chunk outcomes of one run, in dispatch order.
#[derive(Debug, Clone)]
pub struct BatchRun<R> {
    pub outcomes: Vec<ChunkOutcome<R>>,
    /// True when cancellation stopped the run before all chunks dispatched.
    pub cancelled: bool,
}

/// Run `op` over `items` in bounded chunks.
///
/// `op` receives the chunk index and an owned copy of the chunk. An `Err`
/// from `op` is recorded as [`ChunkOutcome::Failed`] and the next chunk is
/// still attempted. Cancellation is checked between chunks (including
/// during the inter-chunk delay); a cancelled run returns the outcomes
/// collected so far and never dispatches the next chunk.
pub async fn apply_batched<T, R, E, F, Fut>(
    items: &[T],
    config: &BatchConfig,
    cancel: &CancellationToken,
    mut op: F,
) -> BatchRun<R>
where
    T: Clone,
    E: std::fmt::Display,
    F: FnMut(usize, Vec<T>) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let chunk_size = config.chunk_size.max(1);
    let mut outcomes = Vec::new();
    let mut cancelled = false;

    for (index, chunk) in items.chunks(chunk_size).enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        if index > 0 && !config.delay_between_chunks.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(config.delay_between_chunks) => {}
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }

        debug!(chunk = index, items = chunk.len(), "dispatching chunk");
        match op(index, chunk.to_vec()).await {
            Ok(result) => outcomes.push(ChunkOutcome::Completed {
                index,
                items: chunk.len(),
                result,
            }),
            Err(error) => {
                warn!(chunk = index, items = chunk.len(), %error, "chunk failed; continuing");
                outcomes.push(ChunkOutcome::Failed {
                    index,
                    items: chunk.len(),
                    error: error.to_string(),
                });
            }
        }
    }

    if cancelled {
        warn!(
            dispatched = outcomes.len(),
            "batch run cancelled; keeping completed outcomes"
        );
    }
    BatchRun {
        outcomes,
        cancelled,
    }
}
