//! # Catalog Sync
//!
//! Propagates confirmed metadata to the remote catalog in resilient batches.
//!
//! ## Components
//!
//! - **Batch utility** (`batch`): apply an async operation to items in
//!   fixed-size chunks with an inter-chunk delay, collect per-chunk
//!   outcomes, and continue past partial failure. Reusable for any future
//!   bulk operation.
//! - **Orchestrator** (`orchestrator`): builds one payload per book group,
//!   drives the chunks through a [`bridge_traits::CatalogClient`], and
//!   aggregates updated/unmatched/failed accounting.
//!
//! A chunk-level transport failure marks that chunk's items failed and the
//! remaining chunks are still attempted: fault isolation per chunk, never
//! fail-fast across the batch. Re-submitting an item after a partial
//! failure is safe: the catalog upserts by identity.

pub mod batch;
pub mod error;
pub mod orchestrator;

pub use batch::{apply_batched, BatchConfig, BatchRun, ChunkOutcome};
pub use error::{Result, SyncError};
pub use orchestrator::{CatalogSyncOrchestrator, SyncConfig, SyncFailure, SyncSummary};
