//! # Selection Index
//!
//! Tracks which files are picked for the next operation.
//!
//! Selecting everything in a 50,000-file library must be O(1), so "all
//! selected" is a tagged variant rather than a materialized id set. Any
//! individual toggle or range operation cancels the `All` mode by seeding an
//! explicit set from the full membership at that instant, then applying
//! itself to the set.

use std::collections::HashSet;

use crate::models::{BookGroup, FileId};
use crate::store::LibraryState;

/// The selection, as intent: everything, or an explicit id set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Explicit(HashSet<FileId>),
}

/// Mutable selection state over a library.
///
/// Operations that need membership (seeding out of `All`, counting,
/// materializing) take the caller's current [`LibraryState`] snapshot; the
/// index itself stores no file list.
#[derive(Debug, Clone)]
pub struct SelectionIndex {
    selection: Selection,
}

impl SelectionIndex {
    /// New index with nothing selected.
    pub fn new() -> Self {
        Self {
            selection: Selection::Explicit(HashSet::new()),
        }
    }

    /// Select every file. O(1); no id set is materialized.
    pub fn select_all(&mut self) {
        self.selection = Selection::All;
    }

    /// Deselect everything. O(1).
    pub fn clear(&mut self) {
        self.selection = Selection::Explicit(HashSet::new());
    }

    pub fn is_all(&self) -> bool {
        matches!(self.selection, Selection::All)
    }

    /// Flip one file. Cancels `All` mode first, seeding the explicit set
    /// from the snapshot's full membership.
    pub fn toggle(&mut self, id: FileId, state: &LibraryState) {
        let set = self.explicit_mut(state);
        if !set.remove(&id) {
            set.insert(id);
        }
    }

    /// Select or deselect every file of a group. Selecting while already in
    /// `All` mode is a no-op; deselecting cancels `All` first.
    pub fn select_group(&mut self, group: &BookGroup, selected: bool, state: &LibraryState) {
        if selected && self.is_all() {
            return;
        }
        let set = self.explicit_mut(state);
        for file in &group.files {
            if selected {
                set.insert(file.id);
            } else {
                set.remove(&file.id);
            }
        }
    }

    /// Select every file of the groups with indexes `i..=j` (either order)
    /// in the snapshot's group list. Cancels `All` mode like any other
    /// explicit operation.
    pub fn select_range(&mut self, state: &LibraryState, i: usize, j: usize) {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        let hi = hi.min(state.groups.len().saturating_sub(1));
        let set = self.explicit_mut(state);
        for group in state.groups.iter().take(hi + 1).skip(lo) {
            for file in &group.files {
                set.insert(file.id);
            }
        }
    }

    pub fn is_selected(&self, id: FileId) -> bool {
        match &self.selection {
            Selection::All => true,
            Selection::Explicit(set) => set.contains(&id),
        }
    }

    /// Number of selected files. Never materializes: `All` mode reads the
    /// snapshot's cached file count.
    pub fn count(&self, state: &LibraryState) -> usize {
        match &self.selection {
            Selection::All => state.file_count(),
            Selection::Explicit(set) => set.len(),
        }
    }

    /// The exact current selection, in library order, regardless of which
    /// mode produced it. Ids no longer present in the library are dropped.
    pub fn materialize(&self, state: &LibraryState) -> Vec<FileId> {
        match &self.selection {
            Selection::All => state.all_file_ids().collect(),
            Selection::Explicit(set) => state
                .all_file_ids()
                .filter(|id| set.contains(id))
                .collect(),
        }
    }
}

impl Default for SelectionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionIndex {
    /// Enter explicit mode, seeding from the snapshot's membership when
    /// leaving `All`.
    fn explicit_mut(&mut self, state: &LibraryState) -> &mut HashSet<FileId> {
        if self.is_all() {
            self.selection = Selection::Explicit(state.all_file_ids().collect());
        }
        match &mut self.selection {
            Selection::Explicit(set) => set,
            Selection::All => unreachable!("explicit mode entered above"),
        }
    }
}
