//! # Change Tracker
//!
//! Computes the per-file diffs that a tag write would apply: for each field,
//! the merged metadata value versus the file's own stale tag value. Multi-file
//! groups routinely hold heterogeneous stale values that all converge to one
//! merged value, so the comparison is always against the specific file.
//!
//! Recomputation is pure and idempotent: it rebuilds the whole map from its
//! inputs, never appends to a previous one.

use bridge_traits::tags::RawTagSnapshot;
use core_library::models::{BookGroup, BookMetadata, ChangeMap, FieldChange, MetadataField};

/// A file's stale tag value for `field`, in the same string view the
/// metadata side uses (genres joined `", "`).
pub fn tag_value(tags: &RawTagSnapshot, field: MetadataField) -> Option<String> {
    match field {
        MetadataField::Title => tags.title.clone(),
        MetadataField::Subtitle => tags.subtitle.clone(),
        MetadataField::Author => tags.author.clone(),
        MetadataField::Narrator => tags.narrator.clone(),
        MetadataField::Series => tags.series.clone(),
        MetadataField::Sequence => tags.sequence.clone(),
        MetadataField::Genres => {
            if tags.genres.is_empty() {
                None
            } else {
                Some(tags.genres.join(", "))
            }
        }
        MetadataField::Publisher => tags.publisher.clone(),
        MetadataField::Year => tags.year.clone(),
        MetadataField::Description => tags.description.clone(),
        MetadataField::Isbn => tags.isbn.clone(),
    }
}

/// Diff computation over merged metadata and stale tag snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTracker;

impl ChangeTracker {
    /// Compute one file's change map.
    ///
    /// A change entry is emitted only where the metadata carries a value and
    /// that value differs from the file's stale tag value. A field the
    /// metadata does not set is absent from the map; no write will occur
    /// for it.
    pub fn compute(metadata: &BookMetadata, tags: &RawTagSnapshot) -> ChangeMap {
        let mut changes = ChangeMap::new();
        for field in MetadataField::ALL {
            let Some(new) = metadata.value_of(field) else {
                continue;
            };
            let old = tag_value(tags, field).unwrap_or_default();
            if new != old {
                changes.insert(field, FieldChange { old, new });
            }
        }
        changes
    }

    /// Recompute every file's change map in a group and its derived count.
    /// Replaces the previous maps entirely.
    pub fn retrack_group(group: &mut BookGroup) {
        for file in &mut group.files {
            file.changes = Self::compute(&group.metadata, &file.tags);
        }
        group.recompute_total_changes();
    }

    /// Fold a written value back into a file's stale snapshot, so the next
    /// recomputation sees the file as converged.
    pub fn refresh_tag(tags: &mut RawTagSnapshot, field: MetadataField, new_value: &str) {
        let value = if new_value.is_empty() {
            None
        } else {
            Some(new_value.to_string())
        };
        match field {
            MetadataField::Title => tags.title = value,
            MetadataField::Subtitle => tags.subtitle = value,
            MetadataField::Author => tags.author = value,
            MetadataField::Narrator => tags.narrator = value,
            MetadataField::Series => tags.series = value,
            MetadataField::Sequence => tags.sequence = value,
            MetadataField::Genres => {
                tags.genres = new_value
                    .split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect();
            }
            MetadataField::Publisher => tags.publisher = value,
            MetadataField::Year => tags.year = value,
            MetadataField::Description => tags.description = value,
            MetadataField::Isbn => tags.isbn = value,
        }
    }
}
