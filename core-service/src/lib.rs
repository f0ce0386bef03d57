//! # Library Service Façade
//!
//! Wires the reconciliation core together and exposes its operations to
//! host applications: scan, metadata editing, remote lookup, selection, tag
//! writing and catalog sync.
//!
//! ## State discipline
//!
//! The service owns the [`LibraryStore`], the system's single shared
//! mutable resource, and is its single mutation entry point. Every
//! operation reads an immutable snapshot; mutations are applied atomically
//! through `store.update`, which recomputes derived counts before
//! publishing. No lock is held across an `.await`: long-running operations
//! (scan, tag writes, catalog sync) work on snapshots and merge their
//! results back afterwards.
//!
//! Desktop hosts typically enable the `desktop-bridges` feature and
//! construct the collaborator set with [`ServiceBridges::desktop`];
//! tests inject in-memory fakes.

pub mod error;

pub use error::{Result, ServiceError};

use bridge_traits::catalog::CatalogClient;
use bridge_traits::lookup::{MetadataLookup, RemoteLookupResult};
use bridge_traits::media::{ChapterDetector, ChapterMark, CoverCandidate, CoverProvider};
use bridge_traits::rename::{RenameOutcome, RenamePlan, Renamer};
use bridge_traits::tags::{TagReader, TagWriter};
use bytes::Bytes;
use core_library::models::{
    FieldSource, FileId, GroupId, MetadataField, SyncItem, WriteStatus,
};
use core_library::selection::SelectionIndex;
use core_library::store::{LibraryState, LibraryStore};
use core_library::LibraryError;
use core_metadata::{ChangeTracker, MetadataMerger};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, ScanEvent, WriteEvent};
use core_scan::{ScanConfig, ScanCoordinator, ScanProgress, ScanWarning};
use core_sync::{CatalogSyncOrchestrator, SyncConfig, SyncSummary};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Collaborator handles the service requires.
pub struct ServiceBridges {
    pub tag_reader: Arc<dyn TagReader>,
    pub tag_writer: Arc<dyn TagWriter>,
    pub catalog: Arc<dyn CatalogClient>,
    pub lookup: Option<Arc<dyn MetadataLookup>>,
    pub renamer: Option<Arc<dyn Renamer>>,
    pub covers: Option<Arc<dyn CoverProvider>>,
    pub chapters: Option<Arc<dyn ChapterDetector>>,
}

#[cfg(feature = "desktop-bridges")]
impl ServiceBridges {
    /// Desktop defaults: `lofty` tag I/O, HTTP catalog client, template
    /// renamer. No lookup provider is wired by default.
    pub fn desktop(catalog_base_url: &str, catalog_token: Option<String>) -> Result<Self> {
        let tag_store = Arc::new(bridge_desktop::LoftyTagStore::new());
        Ok(Self {
            tag_reader: tag_store.clone(),
            tag_writer: tag_store,
            catalog: Arc::new(bridge_desktop::HttpCatalogClient::new(
                catalog_base_url,
                catalog_token,
            )?),
            lookup: None,
            renamer: Some(Arc::new(bridge_desktop::TemplateRenamer::new())),
            covers: None,
            chapters: None,
        })
    }
}

/// Summary of one scan operation, after the store was updated.
#[derive(Debug)]
pub struct ScanSummary {
    pub groups: usize,
    pub files_seen: usize,
    pub warnings: Vec<ScanWarning>,
    pub cancelled: bool,
}

/// A file whose tag write failed.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub file_id: FileId,
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one tag-write pass over the selection.
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub success_ids: Vec<FileId>,
    pub errors: Vec<WriteFailure>,
}

/// Primary façade exposed to host applications.
pub struct LibraryService {
    config: CoreConfig,
    store: Arc<LibraryStore>,
    selection: Mutex<SelectionIndex>,
    events: Arc<EventBus>,
    scanner: ScanCoordinator,
    orchestrator: CatalogSyncOrchestrator,
    merger: MetadataMerger,
    writer: Arc<dyn TagWriter>,
    lookup: Option<Arc<dyn MetadataLookup>>,
    renamer: Option<Arc<dyn Renamer>>,
    covers: Option<Arc<dyn CoverProvider>>,
    chapters: Option<Arc<dyn ChapterDetector>>,
    sync_cancel: Mutex<Option<CancellationToken>>,
}

impl LibraryService {
    /// Create a service from a validated config and collaborator set.
    pub fn new(config: CoreConfig, bridges: ServiceBridges) -> Self {
        let events = Arc::new(EventBus::new(config.event_buffer));
        let scanner = ScanCoordinator::new(
            ScanConfig {
                workers: config.scan_workers,
                extensions: config.audio_extensions.clone(),
            },
            bridges.tag_reader,
        );
        let orchestrator = CatalogSyncOrchestrator::new(
            SyncConfig {
                chunk_size: config.sync_chunk_size,
                chunk_delay: config.sync_chunk_delay,
            },
            bridges.catalog,
            Arc::clone(&events),
        );
        Self {
            config,
            store: Arc::new(LibraryStore::new()),
            selection: Mutex::new(SelectionIndex::new()),
            events,
            scanner,
            orchestrator,
            merger: MetadataMerger::new(),
            writer: bridges.tag_writer,
            lookup: bridges.lookup,
            renamer: bridges.renamer,
            covers: bridges.covers,
            chapters: bridges.chapters,
            sync_cancel: Mutex::new(None),
        }
    }

    /// The event bus carrying push-based progress notifications.
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Immutable snapshot of the current library state.
    pub fn snapshot(&self) -> Arc<LibraryState> {
        self.store.snapshot()
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Full scan of `paths`. Freshly built groups replace any prior group
    /// sharing a file path; groups the scan did not touch are kept. A
    /// cancelled scan installs whatever completed.
    #[instrument(skip(self), fields(roots = paths.len()))]
    pub async fn scan(&self, paths: &[PathBuf]) -> Result<ScanSummary> {
        self.events
            .emit(CoreEvent::Scan(ScanEvent::Started {
                paths: paths.iter().map(|p| p.display().to_string()).collect(),
            }))
            .ok();

        let report = match self.scanner.scan(paths).await {
            Ok(report) => report,
            Err(e) => {
                self.events
                    .emit(CoreEvent::Scan(ScanEvent::Failed {
                        message: e.to_string(),
                    }))
                    .ok();
                return Err(e.into());
            }
        };

        let summary = ScanSummary {
            groups: report.groups.len(),
            files_seen: report.files_seen,
            warnings: report.warnings,
            cancelled: report.cancelled,
        };
        self.store.replace_overlapping(report.groups);

        if summary.cancelled {
            self.events.emit(CoreEvent::Scan(ScanEvent::Cancelled)).ok();
        } else {
            self.events
                .emit(CoreEvent::Scan(ScanEvent::Completed {
                    groups: summary.groups as u64,
                    files: summary.files_seen as u64,
                    warnings: summary.warnings.len() as u64,
                }))
                .ok();
        }
        Ok(summary)
    }

    /// Poll target for scan progress.
    pub fn scan_progress(&self) -> ScanProgress {
        self.scanner.progress()
    }

    /// Best-effort cooperative cancellation of the active scan.
    pub fn cancel_scan(&self) {
        self.scanner.cancel();
    }

    // ========================================================================
    // Metadata Editing
    // ========================================================================

    /// Apply a user edit to one group's field. The value is marked
    /// `manual` and every file's diff is recomputed.
    pub fn edit_field(
        &self,
        group_id: GroupId,
        field: MetadataField,
        value: &str,
    ) -> Result<()> {
        self.store.update(|state| {
            let group = state
                .group_mut(group_id)
                .ok_or_else(|| LibraryError::GroupNotFound(group_id.to_string()))?;
            group.metadata.set(field, value, FieldSource::Manual);
            ChangeTracker::retrack_group(group);
            Ok(())
        })
    }

    /// Apply the same user edit to several groups. Unknown ids are skipped;
    /// returns the number of groups edited.
    pub fn edit_field_bulk(
        &self,
        group_ids: &[GroupId],
        field: MetadataField,
        value: &str,
    ) -> usize {
        self.store.update(|state| {
            let mut edited = 0;
            for id in group_ids {
                if let Some(group) = state.group_mut(*id) {
                    group.metadata.set(field, value, FieldSource::Manual);
                    ChangeTracker::retrack_group(group);
                    edited += 1;
                }
            }
            edited
        })
    }

    /// Query the lookup provider for a group, using its current title and
    /// author. Reads a snapshot; holds no lock across the network call.
    pub async fn search_lookup(&self, group_id: GroupId) -> Result<Vec<RemoteLookupResult>> {
        let lookup = self
            .lookup
            .as_ref()
            .ok_or(ServiceError::CapabilityMissing("metadata lookup"))?;
        let snapshot = self.store.snapshot();
        let group = snapshot
            .group(group_id)
            .ok_or_else(|| LibraryError::GroupNotFound(group_id.to_string()))?;
        let title = group
            .metadata
            .value_of(MetadataField::Title)
            .unwrap_or_else(|| group.name.clone());
        let author = group.metadata.value_of(MetadataField::Author);
        Ok(lookup.lookup(&title, author.as_deref()).await?)
    }

    /// Apply a lookup result the user accepted. Replaces every field except
    /// `manual` ones, then recomputes the group's diffs.
    pub fn apply_lookup(&self, group_id: GroupId, result: &RemoteLookupResult) -> Result<usize> {
        self.store.update(|state| {
            let group = state
                .group_mut(group_id)
                .ok_or_else(|| LibraryError::GroupNotFound(group_id.to_string()))?;
            let applied = self.merger.apply_lookup(&mut group.metadata, result);
            ChangeTracker::retrack_group(group);
            Ok(applied)
        })
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_all(&self) {
        self.selection.lock().select_all();
    }

    pub fn clear_selection(&self) {
        self.selection.lock().clear();
    }

    pub fn toggle_selection(&self, file_id: FileId) {
        let snapshot = self.store.snapshot();
        self.selection.lock().toggle(file_id, &snapshot);
    }

    pub fn select_group(&self, group_id: GroupId, selected: bool) -> Result<()> {
        let snapshot = self.store.snapshot();
        let group = snapshot
            .group(group_id)
            .ok_or_else(|| LibraryError::GroupNotFound(group_id.to_string()))?;
        self.selection.lock().select_group(group, selected, &snapshot);
        Ok(())
    }

    /// Select every file of the groups at indexes `i..=j` in library order.
    pub fn select_range(&self, i: usize, j: usize) {
        let snapshot = self.store.snapshot();
        self.selection.lock().select_range(&snapshot, i, j);
    }

    pub fn is_selected(&self, file_id: FileId) -> bool {
        self.selection.lock().is_selected(file_id)
    }

    /// Selected file count; O(1) in all-selected mode.
    pub fn selected_count(&self) -> usize {
        let snapshot = self.store.snapshot();
        self.selection.lock().count(&snapshot)
    }

    /// The exact current selection, in library order.
    pub fn selected_files(&self) -> Vec<FileId> {
        let snapshot = self.store.snapshot();
        self.selection.lock().materialize(&snapshot)
    }

    // ========================================================================
    // Tag Writing
    // ========================================================================

    /// Write the pending changes of every selected file, sequentially,
    /// emitting push progress per file. Per-file failures are recorded and
    /// never block the rest of the batch. Successful files get their stale
    /// snapshots refreshed so their change maps recompute empty.
    pub async fn write_selected(&self, backup: Option<bool>) -> Result<WriteReport> {
        let backup = backup.unwrap_or(self.config.backup_before_write);
        let snapshot = self.store.snapshot();
        let selected: HashSet<FileId> = self
            .selection
            .lock()
            .materialize(&snapshot)
            .into_iter()
            .collect();

        struct WorkItem {
            group_id: GroupId,
            file_id: FileId,
            path: PathBuf,
            fields: BTreeMap<String, String>,
        }

        let mut work = Vec::new();
        for group in &snapshot.groups {
            for file in &group.files {
                if selected.contains(&file.id) && file.has_pending_changes() {
                    work.push(WorkItem {
                        group_id: group.id,
                        file_id: file.id,
                        path: file.path.clone(),
                        fields: file
                            .changes
                            .iter()
                            .map(|(field, change)| {
                                (field.as_str().to_string(), change.new.clone())
                            })
                            .collect(),
                    });
                }
            }
        }

        let total = work.len() as u64;
        self.events
            .emit(CoreEvent::Write(WriteEvent::Started { total }))
            .ok();

        let mut succeeded: Vec<(GroupId, FileId)> = Vec::new();
        let mut failed: Vec<(GroupId, WriteFailure)> = Vec::new();
        for (index, item) in work.into_iter().enumerate() {
            match self.writer.write_tags(&item.path, &item.fields, backup).await {
                Ok(()) => succeeded.push((item.group_id, item.file_id)),
                Err(e) => {
                    warn!(path = %item.path.display(), error = %e, "tag write failed");
                    self.events
                        .emit(CoreEvent::Write(WriteEvent::FileFailed {
                            path: item.path.display().to_string(),
                            reason: e.to_string(),
                        }))
                        .ok();
                    failed.push((
                        item.group_id,
                        WriteFailure {
                            file_id: item.file_id,
                            path: item.path,
                            reason: e.to_string(),
                        },
                    ));
                }
            }
            self.events
                .emit(CoreEvent::Write(WriteEvent::Progress {
                    current: index as u64 + 1,
                    total,
                }))
                .ok();
        }

        // Merge outcomes back through the single mutation entry point.
        self.store.update(|state| {
            for (group_id, file_id) in &succeeded {
                if let Some(file) = state
                    .group_mut(*group_id)
                    .and_then(|g| g.file_mut(*file_id))
                {
                    let changes = std::mem::take(&mut file.changes);
                    for (field, change) in &changes {
                        ChangeTracker::refresh_tag(&mut file.tags, *field, &change.new);
                    }
                    file.status = WriteStatus::Success;
                }
            }
            for (group_id, failure) in &failed {
                if let Some(file) = state
                    .group_mut(*group_id)
                    .and_then(|g| g.file_mut(failure.file_id))
                {
                    file.status = WriteStatus::Failed {
                        reason: failure.reason.clone(),
                    };
                }
            }
            let touched: HashSet<GroupId> = succeeded
                .iter()
                .map(|(g, _)| *g)
                .chain(failed.iter().map(|(g, _)| *g))
                .collect();
            for group_id in touched {
                if let Some(group) = state.group_mut(group_id) {
                    ChangeTracker::retrack_group(group);
                }
            }
        });

        let report = WriteReport {
            success_ids: succeeded.iter().map(|(_, f)| *f).collect(),
            errors: failed.into_iter().map(|(_, f)| f).collect(),
        };
        self.events
            .emit(CoreEvent::Write(WriteEvent::Completed {
                written: report.success_ids.len() as u64,
                failed: report.errors.len() as u64,
            }))
            .ok();
        info!(
            written = report.success_ids.len(),
            failed = report.errors.len(),
            "tag write pass finished"
        );
        Ok(report)
    }

    // ========================================================================
    // Catalog Sync
    // ========================================================================

    /// Push groups to the remote catalog in chunks. With `group_ids`,
    /// exactly those groups are pushed; without, every group that has at
    /// least one successfully written file. Works on a snapshot taken
    /// before the first network call.
    pub async fn sync_to_catalog(&self, group_ids: Option<&[GroupId]>) -> Result<SyncSummary> {
        let snapshot = self.store.snapshot();
        let items: Vec<SyncItem> = match group_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| snapshot.group(*id))
                .filter_map(|g| g.sync_item())
                .collect(),
            None => snapshot
                .groups
                .iter()
                .filter(|g| g.files.iter().any(|f| f.status.is_success()))
                .filter_map(|g| g.sync_item())
                .collect(),
        };

        let token = CancellationToken::new();
        {
            let mut active = self.sync_cancel.lock();
            if active.is_some() {
                return Err(core_sync::SyncError::SyncInProgress.into());
            }
            *active = Some(token.clone());
        }
        let result = self.orchestrator.sync_items(&items, &token).await;
        *self.sync_cancel.lock() = None;
        Ok(result?)
    }

    /// Best-effort cooperative cancellation of the active catalog sync.
    pub fn cancel_sync(&self) {
        if let Some(token) = self.sync_cancel.lock().as_ref() {
            token.cancel();
        }
    }

    // ========================================================================
    // Covers & Chapters (opaque passthroughs)
    // ========================================================================

    /// Search cover candidates for a group using its current title/author.
    /// Pure passthrough; cover handling has no bearing on the
    /// reconciliation state machine.
    pub async fn search_covers(&self, group_id: GroupId) -> Result<Vec<CoverCandidate>> {
        let covers = self
            .covers
            .as_ref()
            .ok_or(ServiceError::CapabilityMissing("cover provider"))?;
        let snapshot = self.store.snapshot();
        let group = snapshot
            .group(group_id)
            .ok_or_else(|| LibraryError::GroupNotFound(group_id.to_string()))?;
        let title = group
            .metadata
            .value_of(MetadataField::Title)
            .unwrap_or_else(|| group.name.clone());
        let author = group.metadata.value_of(MetadataField::Author);
        Ok(covers.search(&title, author.as_deref()).await?)
    }

    /// Fetch the raw bytes of a cover candidate.
    pub async fn fetch_cover(&self, url: &str) -> Result<Bytes> {
        let covers = self
            .covers
            .as_ref()
            .ok_or(ServiceError::CapabilityMissing("cover provider"))?;
        Ok(covers.fetch(url).await?)
    }

    /// Detect chapter boundaries within one file.
    pub async fn detect_chapters(&self, file_id: FileId) -> Result<Vec<ChapterMark>> {
        let chapters = self
            .chapters
            .as_ref()
            .ok_or(ServiceError::CapabilityMissing("chapter detector"))?;
        let snapshot = self.store.snapshot();
        let (_, file) = snapshot
            .file(file_id)
            .ok_or_else(|| LibraryError::FileNotFound(file_id.to_string()))?;
        Ok(chapters.detect(&file.path).await?)
    }

    // ========================================================================
    // Renaming
    // ========================================================================

    /// Preview renames for every file of a group against `template`.
    pub async fn preview_renames(
        &self,
        group_id: GroupId,
        template: &str,
    ) -> Result<Vec<RenamePlan>> {
        let renamer = self
            .renamer
            .as_ref()
            .ok_or(ServiceError::CapabilityMissing("renamer"))?;
        let snapshot = self.store.snapshot();
        let group = snapshot
            .group(group_id)
            .ok_or_else(|| LibraryError::GroupNotFound(group_id.to_string()))?;
        let fields = group.metadata.field_map();

        let mut plans = Vec::with_capacity(group.files.len());
        for file in &group.files {
            plans.push(renamer.preview(&file.path, &fields, template).await?);
        }
        Ok(plans)
    }

    /// Apply reviewed rename plans and fold the new paths back into the
    /// library.
    pub async fn confirm_renames(&self, plans: &[RenamePlan]) -> Result<RenameOutcome> {
        let renamer = self
            .renamer
            .as_ref()
            .ok_or(ServiceError::CapabilityMissing("renamer"))?;
        let outcome = renamer.confirm(plans).await?;

        let failed_paths: HashSet<&PathBuf> = outcome.errors.iter().map(|e| &e.path).collect();
        self.store.update(|state| {
            for plan in plans.iter().filter(|p| p.changed) {
                if failed_paths.contains(&plan.old_path) {
                    continue;
                }
                for group in &mut state.groups {
                    if let Some(file) = group.files.iter_mut().find(|f| f.path == plan.old_path)
                    {
                        file.path = plan.new_path.clone();
                        file.filename = plan
                            .new_path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or_default()
                            .to_string();
                    }
                }
            }
        });
        Ok(outcome)
    }
}
