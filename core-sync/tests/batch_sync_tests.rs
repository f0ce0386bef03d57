//! Integration tests for chunked catalog sync: accounting across
//! partial failures, unmatched handling, cancellation, and the fatal
//! connection check.

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogBatchOutcome, CatalogClient, CatalogFailure, CatalogPayload};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use core_library::models::{BookMetadata, FieldSource, MetadataField, SyncItem};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_sync::{CatalogSyncOrchestrator, SyncConfig, SyncError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Catalog
// ============================================================================

/// Catalog client scripted per call index.
struct MockCatalog {
    connect_calls: AtomicUsize,
    push_calls: AtomicUsize,
    /// Call indexes (0-based) that fail at the transport level.
    failing_calls: HashSet<usize>,
    /// Paths the catalog reports as unmatched.
    unmatched_paths: HashSet<String>,
    /// Paths the catalog reports as per-item failures.
    rejected_paths: HashSet<String>,
    connect_fails: bool,
    /// Token to cancel during the given call index, simulating a user
    /// cancelling mid-run.
    cancel_during: Option<(usize, CancellationToken)>,
}

impl MockCatalog {
    fn healthy() -> Self {
        Self {
            connect_calls: AtomicUsize::new(0),
            push_calls: AtomicUsize::new(0),
            failing_calls: HashSet::new(),
            unmatched_paths: HashSet::new(),
            rejected_paths: HashSet::new(),
            connect_fails: false,
            cancel_during: None,
        }
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn connect(&self) -> BridgeResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.connect_fails {
            return Err(BridgeError::CatalogUnreachable("refused".into()));
        }
        Ok(())
    }

    async fn push_updates(&self, items: &[CatalogPayload]) -> BridgeResult<CatalogBatchOutcome> {
        let call = self.push_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((at, token)) = &self.cancel_during {
            if call == *at {
                token.cancel();
            }
        }
        if self.failing_calls.contains(&call) {
            return Err(BridgeError::Catalog("transport down".into()));
        }
        let mut outcome = CatalogBatchOutcome::default();
        for item in items {
            if self.unmatched_paths.contains(&item.path) {
                outcome.unmatched.push(item.path.clone());
            } else if self.rejected_paths.contains(&item.path) {
                outcome.failed.push(CatalogFailure {
                    path: item.path.clone(),
                    reason: "invalid entry".into(),
                });
            } else {
                outcome.updated += 1;
            }
        }
        Ok(outcome)
    }
}

fn items(count: usize) -> Vec<SyncItem> {
    (0..count)
        .map(|i| {
            let mut metadata = BookMetadata::default();
            metadata.set(MetadataField::Title, &format!("Book {i}"), FieldSource::FileTag);
            SyncItem {
                path: format!("/books/{i}/01.mp3"),
                metadata,
            }
        })
        .collect()
}

fn orchestrator(client: Arc<MockCatalog>) -> (CatalogSyncOrchestrator, Arc<EventBus>) {
    let events = Arc::new(EventBus::new(512));
    let config = SyncConfig {
        chunk_size: 50,
        chunk_delay: Duration::ZERO,
    };
    (
        CatalogSyncOrchestrator::new(config, client, Arc::clone(&events)),
        events,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_failing_middle_chunk_fails_only_its_items() {
    let mut catalog = MockCatalog::healthy();
    catalog.failing_calls.insert(1); // chunk 2 of 3
    let client = Arc::new(catalog);
    let (orchestrator, _events) = orchestrator(Arc::clone(&client));

    let cancel = CancellationToken::new();
    let summary = orchestrator.sync_items(&items(120), &cancel).await.unwrap();

    assert_eq!(summary.submitted, 120);
    assert_eq!(summary.updated, 100);
    assert_eq!(summary.failed.len(), 20);
    assert!(summary.unmatched.is_empty());
    assert!(!summary.cancelled);
    assert_eq!(client.push_calls.load(Ordering::SeqCst), 3);

    // The failed items are exactly chunk 2's paths.
    assert!(summary
        .failed
        .iter()
        .all(|f| f.reason.contains("transport down")));
    assert!(summary.failed.iter().any(|f| f.path == "/books/50/01.mp3"));
    assert!(summary.failed.iter().any(|f| f.path == "/books/99/01.mp3"));
}

#[tokio::test]
async fn test_accounting_never_exceeds_submitted() {
    let mut catalog = MockCatalog::healthy();
    catalog.unmatched_paths.insert("/books/3/01.mp3".into());
    catalog.unmatched_paths.insert("/books/7/01.mp3".into());
    catalog.rejected_paths.insert("/books/5/01.mp3".into());
    let (orchestrator, _events) = orchestrator(Arc::new(catalog));

    let cancel = CancellationToken::new();
    let summary = orchestrator.sync_items(&items(10), &cancel).await.unwrap();

    assert_eq!(summary.updated, 7);
    assert_eq!(summary.unmatched.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.accounted() <= summary.submitted as u64);
    assert_eq!(summary.failed[0].reason, "invalid entry");
}

#[tokio::test]
async fn test_cancellation_mid_run_keeps_completed_chunks() {
    let cancel = CancellationToken::new();
    let mut catalog = MockCatalog::healthy();
    catalog.cancel_during = Some((0, cancel.clone()));
    let client = Arc::new(catalog);
    let (orchestrator, _events) = orchestrator(Arc::clone(&client));

    let summary = orchestrator.sync_items(&items(120), &cancel).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.updated, 50);
    // Chunk 2 was never dispatched.
    assert_eq!(client.push_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_catalog_is_the_only_fatal_error() {
    let mut catalog = MockCatalog::healthy();
    catalog.connect_fails = true;
    let client = Arc::new(catalog);
    let (orchestrator, _events) = orchestrator(Arc::clone(&client));

    let cancel = CancellationToken::new();
    let result = orchestrator.sync_items(&items(10), &cancel).await;

    assert!(matches!(result, Err(SyncError::Unreachable(_))));
    assert_eq!(client.push_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_item_list_skips_the_connection_check() {
    let client = Arc::new(MockCatalog::healthy());
    let (orchestrator, _events) = orchestrator(Arc::clone(&client));

    let cancel = CancellationToken::new();
    let summary = orchestrator.sync_items(&[], &cancel).await.unwrap();

    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.accounted(), 0);
    assert_eq!(client.connect_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_progress_events_cover_every_chunk() {
    let (orchestrator, events) = orchestrator(Arc::new(MockCatalog::healthy()));
    let mut stream = events.subscribe();

    let cancel = CancellationToken::new();
    let summary = orchestrator.sync_items(&items(120), &cancel).await.unwrap();
    assert_eq!(summary.updated, 120);

    let mut progress = Vec::new();
    let mut completed = false;
    while let Ok(event) = stream.try_recv() {
        match event {
            CoreEvent::Sync(SyncEvent::Progress { current, total }) => {
                progress.push((current, total));
            }
            CoreEvent::Sync(SyncEvent::Completed {
                updated,
                unmatched,
                failed,
            }) => {
                completed = true;
                assert_eq!((updated, unmatched, failed), (120, 0, 0));
            }
            _ => {}
        }
    }
    assert_eq!(progress, vec![(50, 120), (100, 120), (120, 120)]);
    assert!(completed);
}
