//! # Scan Coordinator
//!
//! Drives a full scan: walk the requested directories, read tags with a
//! bounded worker pool, group the readable files, merge each group's
//! metadata and compute its pending diffs.
//!
//! ## Progress & Cancellation
//!
//! Scan progress is poll-based: workers update a shared
//! [`ScanProgress`] snapshot and callers read it on their own interval.
//! Cancellation is cooperative: the token is checked before each file and
//! whatever was fully processed by then is still grouped and returned.

use bridge_traits::tags::TagReader;
use core_library::models::{AudioFile, BookGroup};
use core_metadata::{ChangeTracker, MetadataMerger};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, ScanError};
use crate::grouper::{FileGrouper, FileProbe};

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Bounded worker count for parallel tag reads.
    pub workers: usize,

    /// Audio file extensions to include (lowercase, no dot).
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self {
            workers: (cores * 2).clamp(2, 8),
            extensions: ["mp3", "m4a", "m4b", "flac", "ogg", "opus", "aac", "wav", "wma"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Pollable snapshot of a running scan.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ScanProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: Option<String>,
}

/// A file excluded from the scan, with the reason.
#[derive(Debug, Clone)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one scan run.
#[derive(Debug)]
pub struct ScanReport {
    /// Fully merged and diff-tracked groups, ready for the store.
    pub groups: Vec<BookGroup>,
    /// Per-file exclusions; never fatal.
    pub warnings: Vec<ScanWarning>,
    /// True when the run was cancelled; `groups` holds what completed.
    pub cancelled: bool,
    /// Number of audio files discovered (readable or not).
    pub files_seen: usize,
}

/// Coordinates scan runs. One scan at a time.
pub struct ScanCoordinator {
    config: ScanConfig,
    reader: Arc<dyn TagReader>,
    merger: MetadataMerger,
    progress: Arc<Mutex<ScanProgress>>,
    active: Mutex<Option<CancellationToken>>,
    running: AtomicBool,
}

impl ScanCoordinator {
    pub fn new(config: ScanConfig, reader: Arc<dyn TagReader>) -> Self {
        Self {
            config,
            reader,
            merger: MetadataMerger::new(),
            progress: Arc::new(Mutex::new(ScanProgress::default())),
            active: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Current progress snapshot. Cheap; poll on any interval.
    pub fn progress(&self) -> ScanProgress {
        self.progress.lock().clone()
    }

    /// Best-effort cooperative cancellation of the active scan.
    pub fn cancel(&self) {
        if let Some(token) = self.active.lock().as_ref() {
            token.cancel();
        }
    }

    /// Run a full scan of `paths`.
    ///
    /// # Errors
    ///
    /// [`ScanError::NoPaths`] for an empty path list and
    /// [`ScanError::AlreadyRunning`] when a scan is active. Everything else
    /// (unreadable files, missing directories) is collected as warnings.
    pub async fn scan(&self, paths: &[PathBuf]) -> Result<ScanReport> {
        if paths.is_empty() {
            return Err(ScanError::NoPaths);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyRunning);
        }
        let report = self.scan_inner(paths).await;
        *self.active.lock() = None;
        self.running.store(false, Ordering::SeqCst);
        Ok(report)
    }

    async fn scan_inner(&self, paths: &[PathBuf]) -> ScanReport {
        let started = Instant::now();
        let token = CancellationToken::new();
        *self.active.lock() = Some(token.clone());

        let mut warnings = Vec::new();
        let files = self.discover(paths, &mut warnings);
        let total = files.len();
        info!(files = total, roots = paths.len(), "scan discovery finished");

        *self.progress.lock() = ScanProgress {
            current: 0,
            total,
            current_file: None,
        };

        enum ReadOutcome {
            Probe(FileProbe),
            Warn(ScanWarning),
            Skipped,
        }

        let outcomes: Vec<ReadOutcome> = stream::iter(files)
            .map(|path| {
                let reader = Arc::clone(&self.reader);
                let progress = Arc::clone(&self.progress);
                let token = token.clone();
                async move {
                    if token.is_cancelled() {
                        return ReadOutcome::Skipped;
                    }
                    progress.lock().current_file = Some(path.display().to_string());
                    let result = reader.read_tags(&path).await;
                    progress.lock().current += 1;
                    match result {
                        Ok(tags) => ReadOutcome::Probe(FileProbe::new(path, tags)),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "file excluded from scan");
                            ReadOutcome::Warn(ScanWarning {
                                path,
                                reason: e.to_string(),
                            })
                        }
                    }
                }
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        let cancelled = token.is_cancelled();
        let mut probes = Vec::new();
        for outcome in outcomes {
            match outcome {
                ReadOutcome::Probe(probe) => probes.push(probe),
                ReadOutcome::Warn(warning) => warnings.push(warning),
                ReadOutcome::Skipped => {}
            }
        }
        self.progress.lock().current_file = None;

        let groups = self.build_groups(probes);
        info!(
            groups = groups.len(),
            warnings = warnings.len(),
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan finished"
        );

        ScanReport {
            groups,
            warnings,
            cancelled,
            files_seen: total,
        }
    }

    /// Walk the roots and collect audio files, in path order.
    fn discover(&self, paths: &[PathBuf], warnings: &mut Vec<ScanWarning>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in paths {
            for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        if self.is_audio_file(entry.path()) {
                            files.push(entry.path().to_path_buf());
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let path = e
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| root.clone());
                        warnings.push(ScanWarning {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        files.sort();
        files.dedup();
        files
    }

    fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.config.extensions.iter().any(|known| *known == e))
    }

    /// Group the readable probes, then merge metadata and compute pending
    /// diffs for each group.
    fn build_groups(&self, probes: Vec<FileProbe>) -> Vec<BookGroup> {
        let drafts = FileGrouper::new().group(probes);
        let mut groups = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let tags: Vec<_> = draft.probes.iter().map(|p| p.tags.clone()).collect();
            let outcome = match self.merger.merge_group(&draft.name, &tags, None, None) {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!(group = %draft.name, error = %e, "skipping unmergeable draft");
                    continue;
                }
            };
            let files = draft
                .probes
                .into_iter()
                .map(|p| AudioFile::new(p.path, p.tags))
                .collect();
            let mut group = BookGroup::new(draft.name, draft.group_type, files);
            group.metadata = outcome.metadata;
            group.ambiguities = outcome.ambiguities;
            ChangeTracker::retrack_group(&mut group);
            groups.push(group);
        }
        groups
    }
}
