//! # Library Store
//!
//! The single shared mutable resource of the system: the group/file
//! collection consulted continuously by the UI-facing layer.
//!
//! ## Design
//!
//! State lives in an `Arc<LibraryState>` behind a `parking_lot::RwLock`.
//! Readers call [`LibraryStore::snapshot`], an O(1) Arc clone of an
//! immutable value. Writers go through [`LibraryStore::update`], the sole
//! mutation entry point: it copy-on-writes the state (`Arc::make_mut`),
//! applies the closure, recomputes every derived count, bumps the
//! generation and republishes. A snapshot taken before an update never
//! observes it.
//!
//! The lock is synchronous and guards are confined to these two methods, so
//! no lock is ever held across an `.await`; long-running operations work on
//! snapshots and merge results back through `update`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::models::{AudioFile, BookGroup, FileId, GroupId};

/// Immutable view of the library at one generation.
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    pub groups: Vec<BookGroup>,
    /// When the groups were last (re)built by a scan.
    pub last_scan: Option<DateTime<Utc>>,
    file_count: usize,
    generation: u64,
}

impl LibraryState {
    /// Cached total file count across all groups. O(1); selection counting
    /// relies on this never requiring an iteration of the file list.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Monotonic generation, bumped by every [`LibraryStore::update`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn group(&self, id: GroupId) -> Option<&BookGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut BookGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Locate a file and its owning group.
    pub fn file(&self, id: FileId) -> Option<(&BookGroup, &AudioFile)> {
        self.groups
            .iter()
            .find_map(|g| g.file(id).map(|f| (g, f)))
    }

    /// All file ids in library order (group order, then natural file order).
    pub fn all_file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.groups.iter().flat_map(|g| g.files.iter().map(|f| f.id))
    }

    fn refresh_derived(&mut self) {
        for group in &mut self.groups {
            group.recompute_total_changes();
        }
        self.file_count = self.groups.iter().map(|g| g.files.len()).sum();
    }
}

/// Owned store over [`LibraryState`] with copy-on-write snapshots.
#[derive(Debug, Default)]
pub struct LibraryStore {
    state: RwLock<Arc<LibraryState>>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state. O(1); the returned snapshot is immutable.
    pub fn snapshot(&self) -> Arc<LibraryState> {
        Arc::clone(&self.state.read())
    }

    /// The single mutation entry point. Applies `f` to a writable copy of
    /// the state, recomputes derived counts (`total_changes` per group,
    /// cached file count), bumps the generation and publishes the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut LibraryState) -> R) -> R {
        let mut guard = self.state.write();
        let state = Arc::make_mut(&mut guard);
        let result = f(state);
        state.refresh_derived();
        state.generation += 1;
        result
    }

    /// Install freshly scanned groups, replacing any prior group that shares
    /// a file path with them. Groups untouched by the scan are kept.
    pub fn replace_overlapping(&self, new_groups: Vec<BookGroup>) {
        let incoming_paths: HashSet<PathBuf> = new_groups
            .iter()
            .flat_map(|g| g.files.iter().map(|f| f.path.clone()))
            .collect();
        self.update(|state| {
            let before = state.groups.len();
            state
                .groups
                .retain(|g| !g.files.iter().any(|f| incoming_paths.contains(&f.path)));
            let replaced = before - state.groups.len();
            debug!(
                replaced,
                added = new_groups.len(),
                "installing scanned groups"
            );
            state.groups.extend(new_groups);
            state.last_scan = Some(Utc::now());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldChange, FieldSource, MetadataField};
    use bridge_traits::tags::RawTagSnapshot;
    use crate::models::GroupType;

    fn group_with_files(dir: &str, names: &[&str]) -> BookGroup {
        let files = names
            .iter()
            .map(|n| {
                AudioFile::new(
                    PathBuf::from(format!("{dir}/{n}")),
                    RawTagSnapshot::default(),
                )
            })
            .collect();
        BookGroup::new(dir, GroupType::Chapters, files)
    }

    #[test]
    fn test_snapshot_does_not_observe_later_updates() {
        let store = LibraryStore::new();
        store.replace_overlapping(vec![group_with_files("/books/a", &["01.mp3"])]);

        let before = store.snapshot();
        store.update(|state| {
            state.groups[0]
                .metadata
                .set(MetadataField::Title, "Edited", FieldSource::Manual);
        });

        assert!(before.groups[0].metadata.title.is_none());
        assert_eq!(
            store.snapshot().groups[0]
                .metadata
                .value_of(MetadataField::Title)
                .as_deref(),
            Some("Edited")
        );
        assert!(store.snapshot().generation() > before.generation());
    }

    #[test]
    fn test_update_recomputes_derived_counts() {
        let store = LibraryStore::new();
        store.replace_overlapping(vec![group_with_files("/books/a", &["01.mp3", "02.mp3"])]);

        store.update(|state| {
            // Mutate a change map directly; the store, not the caller, is
            // responsible for total_changes.
            let file = &mut state.groups[0].files[0];
            file.changes.insert(
                MetadataField::Author,
                FieldChange {
                    old: String::new(),
                    new: "A".into(),
                },
            );
        });

        let snap = store.snapshot();
        assert_eq!(snap.groups[0].total_changes, 1);
        assert_eq!(snap.file_count(), 2);
    }

    #[test]
    fn test_rescan_replaces_groups_sharing_a_path() {
        let store = LibraryStore::new();
        store.replace_overlapping(vec![
            group_with_files("/books/a", &["01.mp3", "02.mp3"]),
            group_with_files("/books/b", &["b.m4b"]),
        ]);

        // Rescan of /books/a only: the /books/a group is replaced wholesale,
        // /books/b is untouched.
        let rescanned = group_with_files("/books/a", &["01.mp3", "02.mp3", "03.mp3"]);
        let rescanned_id = rescanned.id;
        store.replace_overlapping(vec![rescanned]);

        let snap = store.snapshot();
        assert_eq!(snap.groups.len(), 2);
        assert!(snap.group(rescanned_id).is_some());
        assert_eq!(snap.file_count(), 4);
        assert!(snap.groups.iter().any(|g| g.name == "/books/b"));
    }
}
