//! Integration tests for the scan pipeline: discovery, bounded tag reading,
//! grouping, merging and diff tracking against a stubbed tag reader.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::tags::{RawTagSnapshot, TagReader};
use core_library::models::{FieldSource, GroupType, MetadataField};
use core_scan::{ScanConfig, ScanCoordinator, ScanError};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

// ============================================================================
// Stub Collaborators
// ============================================================================

/// Tag reader backed by a path → snapshot map, with an optional failure set.
struct StubTagReader {
    tags: HashMap<PathBuf, RawTagSnapshot>,
    failing: HashSet<PathBuf>,
}

impl StubTagReader {
    fn new(tags: HashMap<PathBuf, RawTagSnapshot>) -> Self {
        Self {
            tags,
            failing: HashSet::new(),
        }
    }

    fn with_failing(mut self, path: PathBuf) -> Self {
        self.failing.insert(path);
        self
    }
}

#[async_trait]
impl TagReader for StubTagReader {
    async fn read_tags(&self, path: &Path) -> BridgeResult<RawTagSnapshot> {
        if self.failing.contains(path) {
            return Err(BridgeError::TagRead {
                path: path.display().to_string(),
                message: "corrupt header".into(),
            });
        }
        Ok(self.tags.get(path).cloned().unwrap_or_default())
    }
}

/// Reader that cancels the coordinator after a fixed number of reads.
struct CancellingReader {
    coordinator: Arc<OnceLock<Arc<ScanCoordinator>>>,
    cancel_after: usize,
    reads: AtomicUsize,
}

#[async_trait]
impl TagReader for CancellingReader {
    async fn read_tags(&self, _path: &Path) -> BridgeResult<RawTagSnapshot> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if read == self.cancel_after {
            self.coordinator
                .get()
                .expect("coordinator registered")
                .cancel();
        }
        Ok(RawTagSnapshot::default())
    }
}

fn snapshot(author: &str, title: &str) -> RawTagSnapshot {
    RawTagSnapshot {
        author: Some(author.to_string()),
        title: Some(title.to_string()),
        ..Default::default()
    }
}

fn touch(path: &Path) {
    File::create(path).unwrap();
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_majority_merge_produces_diff_for_dissenting_file() {
    let dir = TempDir::new().unwrap();
    let book = dir.path().join("The Book");
    std::fs::create_dir(&book).unwrap();

    let mut tags = HashMap::new();
    for (name, author) in [("part1.mp3", "A"), ("part2.mp3", "A"), ("part3.mp3", "A2")] {
        let path = book.join(name);
        touch(&path);
        tags.insert(path, snapshot(author, "T"));
    }

    let coordinator = ScanCoordinator::new(
        ScanConfig::default(),
        Arc::new(StubTagReader::new(tags)),
    );
    let report = coordinator.scan(&[dir.path().to_path_buf()]).await.unwrap();

    assert!(!report.cancelled);
    assert!(report.warnings.is_empty());
    assert_eq!(report.groups.len(), 1);

    let group = &report.groups[0];
    assert_eq!(group.files.len(), 3);
    assert_eq!(
        group.metadata.value_of(MetadataField::Author).as_deref(),
        Some("A")
    );
    assert_eq!(
        group.metadata.source_of(MetadataField::Author),
        Some(FieldSource::FileTag)
    );
    assert_eq!(group.ambiguities.len(), 1);

    // Only the dissenting file converges toward the majority value.
    assert_eq!(group.total_changes, 1);
    let dissenter = group
        .files
        .iter()
        .find(|f| f.tags.author.as_deref() == Some("A2"))
        .unwrap();
    let change = dissenter.changes.get(&MetadataField::Author).unwrap();
    assert_eq!(change.old, "A2");
    assert_eq!(change.new, "A");
}

#[tokio::test]
async fn test_unreadable_file_is_excluded_not_fatal() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.m4b");
    let bad = dir.path().join("bad.m4b");
    touch(&good);
    touch(&bad);

    let mut tags = HashMap::new();
    tags.insert(good.clone(), snapshot("A", "T"));

    let reader = StubTagReader::new(tags).with_failing(bad.clone());
    let coordinator = ScanCoordinator::new(ScanConfig::default(), Arc::new(reader));
    let report = coordinator.scan(&[dir.path().to_path_buf()]).await.unwrap();

    assert_eq!(report.files_seen, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].path, bad);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].group_type, GroupType::Single);
    assert_eq!(report.groups[0].files[0].path, good);
}

#[tokio::test]
async fn test_non_audio_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("book.mp3"));
    touch(&dir.path().join("cover.jpg"));
    touch(&dir.path().join("notes.txt"));

    let coordinator = ScanCoordinator::new(
        ScanConfig::default(),
        Arc::new(StubTagReader::new(HashMap::new())),
    );
    let report = coordinator.scan(&[dir.path().to_path_buf()]).await.unwrap();

    assert_eq!(report.files_seen, 1);
    assert_eq!(report.groups.len(), 1);
}

#[tokio::test]
async fn test_empty_path_list_is_fatal() {
    let coordinator = ScanCoordinator::new(
        ScanConfig::default(),
        Arc::new(StubTagReader::new(HashMap::new())),
    );
    assert!(matches!(
        coordinator.scan(&[]).await,
        Err(ScanError::NoPaths)
    ));
}

#[tokio::test]
async fn test_cancellation_keeps_completed_work() {
    let dir = TempDir::new().unwrap();
    for sub in ["a", "b", "c"] {
        let folder = dir.path().join(sub);
        std::fs::create_dir(&folder).unwrap();
        touch(&folder.join("book.mp3"));
    }

    let slot = Arc::new(OnceLock::new());
    let reader = CancellingReader {
        coordinator: Arc::clone(&slot),
        cancel_after: 1,
        reads: AtomicUsize::new(0),
    };
    let coordinator = Arc::new(ScanCoordinator::new(
        ScanConfig {
            workers: 1,
            ..ScanConfig::default()
        },
        Arc::new(reader),
    ));
    slot.set(Arc::clone(&coordinator)).ok();

    let report = coordinator.scan(&[dir.path().to_path_buf()]).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.files_seen, 3);
    // The file read before cancellation is still grouped; the rest were
    // skipped, not errored.
    assert_eq!(report.groups.len(), 1);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_progress_reaches_total_on_completion() {
    let dir = TempDir::new().unwrap();
    let mut tags = HashMap::new();
    for i in 0..5 {
        let path = dir.path().join(format!("{i:02}.mp3"));
        touch(&path);
        tags.insert(path, snapshot("A", "T"));
    }

    let coordinator = ScanCoordinator::new(
        ScanConfig::default(),
        Arc::new(StubTagReader::new(tags)),
    );
    let report = coordinator.scan(&[dir.path().to_path_buf()]).await.unwrap();
    assert!(!report.cancelled);

    let progress = coordinator.progress();
    assert_eq!(progress.current, 5);
    assert_eq!(progress.total, 5);
    assert!(progress.current_file.is_none());
}
