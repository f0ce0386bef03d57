//! # Event Bus
//!
//! Push-based progress and lifecycle notifications over
//! `tokio::sync::broadcast`. Long-running operations emit an event after
//! each unit of work (per file written, per chunk synced); subscribers
//! listen independently and slow ones receive `RecvError::Lagged` instead of
//! blocking the emitter.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, WriteEvent};
//!
//! let bus = EventBus::new(100);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Write(WriteEvent::Progress { current: 1, total: 4 })).ok();
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Scan lifecycle events
    Scan(ScanEvent),
    /// Tag-write progress events
    Write(WriteEvent),
    /// Catalog sync events
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Write(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
        }
    }
}

/// Scan lifecycle. Per-file scan progress itself is poll-based (the scan
/// workers cannot push); the bus carries the operation boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ScanEvent {
    Started { paths: Vec<String> },
    Completed { groups: u64, files: u64, warnings: u64 },
    Cancelled,
    Failed { message: String },
}

impl ScanEvent {
    pub fn description(&self) -> &'static str {
        match self {
            ScanEvent::Started { .. } => "Scan started",
            ScanEvent::Completed { .. } => "Scan completed",
            ScanEvent::Cancelled => "Scan cancelled",
            ScanEvent::Failed { .. } => "Scan failed",
        }
    }
}

/// Tag-write progress, pushed after each file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum WriteEvent {
    Started { total: u64 },
    Progress { current: u64, total: u64 },
    FileFailed { path: String, reason: String },
    Completed { written: u64, failed: u64 },
}

impl WriteEvent {
    pub fn description(&self) -> &'static str {
        match self {
            WriteEvent::Started { .. } => "Tag write started",
            WriteEvent::Progress { .. } => "Tag write progress",
            WriteEvent::FileFailed { .. } => "Tag write failed for a file",
            WriteEvent::Completed { .. } => "Tag write completed",
        }
    }
}

/// Catalog sync lifecycle and per-chunk progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SyncEvent {
    Started { total_items: u64, chunks: u64 },
    Progress { current: u64, total: u64 },
    ChunkFailed { chunk_index: u64, items: u64 },
    Completed { updated: u64, unmatched: u64, failed: u64 },
    Cancelled,
    Failed { message: String },
}

impl SyncEvent {
    pub fn description(&self) -> &'static str {
        match self {
            SyncEvent::Started { .. } => "Catalog sync started",
            SyncEvent::Progress { .. } => "Catalog sync progress",
            SyncEvent::ChunkFailed { .. } => "Catalog sync chunk failed",
            SyncEvent::Completed { .. } => "Catalog sync completed",
            SyncEvent::Cancelled => "Catalog sync cancelled",
            SyncEvent::Failed { .. } => "Catalog sync failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Returns the number of
    /// receivers the event reached; an `Err` simply means nobody is
    /// listening, which emitters ignore with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Open an independent subscription.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let event = CoreEvent::Write(WriteEvent::Progress { current: 2, total: 5 });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers_is_not_fatal() {
        let bus = EventBus::default();
        assert!(bus.emit(CoreEvent::Scan(ScanEvent::Cancelled)).is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Sync(SyncEvent::Progress { current: 50, total: 120 });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Sync\""));
        assert!(json.contains("\"event\":\"progress\""));
    }
}
