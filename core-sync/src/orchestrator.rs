//! # Catalog Sync Orchestrator
//!
//! Drives bulk propagation of confirmed metadata to the remote catalog:
//! one [`bridge_traits::CatalogPayload`] per book group, dispatched in
//! fixed-size chunks via [`crate::batch::apply_batched`], with
//! updated/unmatched/failed accounting aggregated across chunks.
//!
//! Connection establishment is verified once up front; that is the only
//! fatal error of a sync run. Every later failure is per chunk: the chunk's
//! items are marked failed and the remaining chunks are still attempted.
//! Network calls operate on the payload list built from a store snapshot;
//! no lock is held anywhere near them.

use bridge_traits::catalog::{CatalogClient, CatalogPayload};
use core_library::models::{MetadataField, SyncItem};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::batch::{apply_batched, BatchConfig, ChunkOutcome};
use crate::error::{Result, SyncError};

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Items per catalog call.
    pub chunk_size: usize,
    /// Pause between calls, respecting the catalog's rate limits.
    pub chunk_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            chunk_delay: Duration::from_millis(250),
        }
    }
}

/// An item that failed during sync, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub path: String,
    pub reason: String,
}

/// Aggregate accounting of one sync run.
///
/// Invariant: `updated + unmatched.len() + failed.len()` never exceeds
/// `submitted`; the remote side may silently skip items without erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub submitted: usize,
    pub updated: u64,
    pub unmatched: Vec<String>,
    pub failed: Vec<SyncFailure>,
    /// True when cancellation stopped the run early; counts cover the
    /// chunks that completed.
    pub cancelled: bool,
}

impl SyncSummary {
    /// Items accounted for across all three buckets.
    pub fn accounted(&self) -> u64 {
        self.updated + self.unmatched.len() as u64 + self.failed.len() as u64
    }
}

/// Orchestrates chunked catalog updates.
pub struct CatalogSyncOrchestrator {
    config: SyncConfig,
    client: Arc<dyn CatalogClient>,
    events: Arc<EventBus>,
}

impl CatalogSyncOrchestrator {
    pub fn new(config: SyncConfig, client: Arc<dyn CatalogClient>, events: Arc<EventBus>) -> Self {
        Self {
            config,
            client,
            events,
        }
    }

    /// Push `items` to the catalog.
    ///
    /// # Errors
    ///
    /// Only [`SyncError::Unreachable`] when the connection check fails;
    /// every per-chunk failure is folded into the returned summary.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn sync_items(
        &self,
        items: &[SyncItem],
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        let total = items.len();
        if total == 0 {
            return Ok(SyncSummary::default());
        }

        self.client.connect().await.map_err(|e| {
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Failed {
                    message: e.to_string(),
                }))
                .ok();
            SyncError::Unreachable(e.to_string())
        })?;

        let payloads: Vec<CatalogPayload> = items.iter().map(payload_for).collect();
        let chunk_size = self.config.chunk_size.max(1);
        let chunk_count = payloads.len().div_ceil(chunk_size);
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Started {
                total_items: total as u64,
                chunks: chunk_count as u64,
            }))
            .ok();

        let processed = Arc::new(AtomicU64::new(0));
        let total_u64 = total as u64;
        let batch_config = BatchConfig {
            chunk_size,
            delay_between_chunks: self.config.chunk_delay,
        };

        let client = Arc::clone(&self.client);
        let events = Arc::clone(&self.events);
        let counter = Arc::clone(&processed);
        let run = apply_batched(&payloads, &batch_config, cancel, move |index, chunk| {
            let client = Arc::clone(&client);
            let events = Arc::clone(&events);
            let counter = Arc::clone(&counter);
            async move {
                let sent = chunk.len() as u64;
                let result = client.push_updates(&chunk).await;
                if result.is_err() {
                    events
                        .emit(CoreEvent::Sync(SyncEvent::ChunkFailed {
                            chunk_index: index as u64,
                            items: sent,
                        }))
                        .ok();
                }
                let current = counter.fetch_add(sent, Ordering::SeqCst) + sent;
                events
                    .emit(CoreEvent::Sync(SyncEvent::Progress {
                        current,
                        total: total_u64,
                    }))
                    .ok();
                result
            }
        })
        .await;

        let chunk_slices: Vec<&[CatalogPayload]> = payloads.chunks(chunk_size).collect();
        let mut summary = SyncSummary {
            submitted: total,
            cancelled: run.cancelled,
            ..Default::default()
        };
        for outcome in run.outcomes {
            match outcome {
                ChunkOutcome::Completed { result, .. } => {
                    summary.updated += result.updated;
                    summary.unmatched.extend(result.unmatched);
                    summary
                        .failed
                        .extend(result.failed.into_iter().map(|f| SyncFailure {
                            path: f.path,
                            reason: f.reason,
                        }));
                }
                ChunkOutcome::Failed { index, error, .. } => {
                    // Transport failure: the whole chunk counts as failed.
                    summary
                        .failed
                        .extend(chunk_slices[index].iter().map(|p| SyncFailure {
                            path: p.path.clone(),
                            reason: error.clone(),
                        }));
                }
            }
        }

        if summary.cancelled {
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Cancelled))
                .ok();
        } else {
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Completed {
                    updated: summary.updated,
                    unmatched: summary.unmatched.len() as u64,
                    failed: summary.failed.len() as u64,
                }))
                .ok();
        }
        info!(
            submitted = summary.submitted,
            updated = summary.updated,
            unmatched = summary.unmatched.len(),
            failed = summary.failed.len(),
            cancelled = summary.cancelled,
            "catalog sync finished"
        );
        Ok(summary)
    }
}

/// Flatten a [`SyncItem`] into its wire payload.
fn payload_for(item: &SyncItem) -> CatalogPayload {
    let metadata = &item.metadata;
    CatalogPayload {
        path: item.path.clone(),
        title: metadata.value_of(MetadataField::Title),
        subtitle: metadata.value_of(MetadataField::Subtitle),
        author: metadata.value_of(MetadataField::Author),
        narrator: metadata.value_of(MetadataField::Narrator),
        series: metadata.value_of(MetadataField::Series),
        sequence: metadata.value_of(MetadataField::Sequence),
        genres: metadata
            .genres
            .as_ref()
            .map(|g| g.value.clone())
            .unwrap_or_default(),
        publisher: metadata.value_of(MetadataField::Publisher),
        year: metadata.value_of(MetadataField::Year),
        description: metadata.value_of(MetadataField::Description),
        isbn: metadata.value_of(MetadataField::Isbn),
    }
}
