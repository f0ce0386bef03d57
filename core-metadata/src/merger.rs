//! # Metadata Merger
//!
//! Builds one authoritative [`BookMetadata`] record for a group from its
//! files' tags, an optional remote lookup result and optional prior
//! metadata.
//!
//! ## Precedence
//!
//! Per field: `manual` (carried from prior metadata) > `file-tag` >
//! `remote-lookup` > `derived` (folder-name heuristics) > empty. When files
//! disagree on a group-uniform field (title, author), the majority value is
//! selected and the disagreement is recorded as a [`MergeAmbiguity`] for
//! user review; never a fatal condition.
//!
//! Merging is deterministic and idempotent: the same inputs always produce
//! the same metadata and the same `sources`.

use bridge_traits::lookup::RemoteLookupResult;
use bridge_traits::tags::RawTagSnapshot;
use core_library::models::{
    BookMetadata, DissentingValue, FieldSource, MergeAmbiguity, MetadataField,
};
use tracing::debug;

use crate::changes::tag_value;
use crate::error::{MetadataError, Result};

/// Fields that must be uniform across a group; disagreement on these is
/// surfaced as an ambiguity.
const GROUP_UNIFORM_FIELDS: [MetadataField; 2] = [MetadataField::Title, MetadataField::Author];

/// Fields taken from the most common non-empty tag value without flagging.
const PER_FILE_FIELDS: [MetadataField; 8] = [
    MetadataField::Subtitle,
    MetadataField::Narrator,
    MetadataField::Series,
    MetadataField::Sequence,
    MetadataField::Publisher,
    MetadataField::Year,
    MetadataField::Description,
    MetadataField::Isbn,
];

/// Result of merging one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub metadata: BookMetadata,
    pub ambiguities: Vec<MergeAmbiguity>,
}

/// Source-precedence merger. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataMerger;

impl MetadataMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge the tag snapshots of one group's files.
    ///
    /// `folder_name` feeds the `derived` layer, `lookup` the
    /// `remote-lookup` layer, and `prior` contributes its `manual` fields,
    /// which outrank everything.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::EmptyGroup`] when `tags` is empty.
    pub fn merge_group(
        &self,
        folder_name: &str,
        tags: &[RawTagSnapshot],
        lookup: Option<&RemoteLookupResult>,
        prior: Option<&BookMetadata>,
    ) -> Result<MergeOutcome> {
        if tags.is_empty() {
            return Err(MetadataError::EmptyGroup);
        }

        let mut metadata = BookMetadata::default();
        if let Some(prior) = prior {
            copy_manual_fields(&mut metadata, prior);
        }

        let mut ambiguities = Vec::new();

        for field in GROUP_UNIFORM_FIELDS {
            if let Some((chosen, dissenting)) = majority_value(tags, field) {
                metadata.set(field, &chosen, FieldSource::FileTag);
                if !dissenting.is_empty() {
                    debug!(field = %field, chosen = %chosen, "majority merge over disagreeing tags");
                    ambiguities.push(MergeAmbiguity {
                        field,
                        chosen,
                        dissenting,
                    });
                }
            }
        }

        for field in PER_FILE_FIELDS {
            if let Some((chosen, _)) = majority_value(tags, field) {
                metadata.set(field, &chosen, FieldSource::FileTag);
            }
        }

        let tag_genres: Vec<&str> = tags
            .iter()
            .flat_map(|t| t.genres.iter().map(String::as_str))
            .collect();
        if !tag_genres.is_empty() {
            metadata.set_genres(tag_genres, FieldSource::FileTag);
        }

        if let Some(lookup) = lookup {
            fill_gaps_from_lookup(&mut metadata, lookup);
        }

        apply_derived(&mut metadata, folder_name);

        Ok(MergeOutcome {
            metadata,
            ambiguities,
        })
    }

    /// Apply a lookup result the user explicitly accepted. Non-empty lookup
    /// fields replace current values of any provenance except `manual`.
    /// Returns the number of fields applied.
    pub fn apply_lookup(
        &self,
        metadata: &mut BookMetadata,
        lookup: &RemoteLookupResult,
    ) -> usize {
        let mut applied = 0;
        for field in MetadataField::ALL {
            if field == MetadataField::Genres {
                if !lookup.genres.is_empty()
                    && metadata.set_genres(&lookup.genres, FieldSource::RemoteLookup)
                {
                    applied += 1;
                }
                continue;
            }
            if let Some(value) = lookup_field(lookup, field) {
                if metadata.set(field, &value, FieldSource::RemoteLookup) {
                    applied += 1;
                }
            }
        }
        applied
    }
}

/// Carry every `manual` field of `src` into `dst`, structurally, so genre
/// lists survive unsplit.
fn copy_manual_fields(dst: &mut BookMetadata, src: &BookMetadata) {
    macro_rules! carry {
        ($field:ident) => {
            if let Some(sourced) = &src.$field {
                if sourced.is_manual() {
                    dst.$field = Some(sourced.clone());
                }
            }
        };
    }
    carry!(title);
    carry!(subtitle);
    carry!(author);
    carry!(narrator);
    carry!(series);
    carry!(sequence);
    carry!(genres);
    carry!(publisher);
    carry!(year);
    carry!(description);
    carry!(isbn);
}

/// The most frequent non-empty tag value for `field` (first-seen wins a
/// tie), plus the dissenting values and how many files carry each.
fn majority_value(
    tags: &[RawTagSnapshot],
    field: MetadataField,
) -> Option<(String, Vec<DissentingValue>)> {
    // First-seen order so ties and dissent reporting are deterministic.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for snapshot in tags {
        let Some(value) = tag_value(snapshot, field).filter(|v| !v.is_empty()) else {
            continue;
        };
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max()?;
    let chosen_index = counts.iter().position(|(_, n)| *n == best)?;
    let chosen = counts[chosen_index].0.clone();
    let dissenting = counts
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != chosen_index)
        .map(|(_, (value, files))| DissentingValue { value, files })
        .collect();
    Some((chosen, dissenting))
}

/// A lookup result's value for `field`, trimmed and filtered to non-empty.
/// Genres are handled list-wise by the callers.
fn lookup_field(lookup: &RemoteLookupResult, field: MetadataField) -> Option<String> {
    let value = match field {
        MetadataField::Title => &lookup.title,
        MetadataField::Subtitle => &lookup.subtitle,
        MetadataField::Author => &lookup.author,
        MetadataField::Narrator => &lookup.narrator,
        MetadataField::Series => &lookup.series,
        MetadataField::Sequence => &lookup.sequence,
        MetadataField::Publisher => &lookup.publisher,
        MetadataField::Year => &lookup.year,
        MetadataField::Description => &lookup.description,
        MetadataField::Isbn => &lookup.isbn,
        MetadataField::Genres => return None,
    };
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Fill unset fields from a lookup result during a merge. Unlike an
/// explicit apply, this never displaces a value the tags already supplied.
fn fill_gaps_from_lookup(metadata: &mut BookMetadata, lookup: &RemoteLookupResult) {
    for field in MetadataField::ALL {
        if metadata.value_of(field).is_some() {
            continue;
        }
        if field == MetadataField::Genres {
            if !lookup.genres.is_empty() {
                metadata.set_genres(&lookup.genres, FieldSource::RemoteLookup);
            }
            continue;
        }
        if let Some(value) = lookup_field(lookup, field) {
            metadata.set(field, &value, FieldSource::RemoteLookup);
        }
    }
}

/// Folder-name heuristics for the lowest-precedence layer. A folder named
/// `Author - Title` contributes both halves; otherwise the folder name is a
/// title candidate. A `#n` marker in the folder or series value contributes
/// a sequence.
fn apply_derived(metadata: &mut BookMetadata, folder_name: &str) {
    let folder_name = folder_name.trim();
    if folder_name.is_empty() {
        return;
    }

    let (author_part, title_part) = match folder_name.split_once(" - ") {
        Some((author, title)) => (Some(author.trim()), title.trim()),
        None => (None, folder_name),
    };

    if metadata.value_of(MetadataField::Title).is_none() && !title_part.is_empty() {
        let title = strip_sequence_marker(title_part);
        metadata.set(MetadataField::Title, &title, FieldSource::Derived);
    }
    if metadata.value_of(MetadataField::Author).is_none() {
        if let Some(author) = author_part.filter(|a| !a.is_empty()) {
            metadata.set(MetadataField::Author, author, FieldSource::Derived);
        }
    }
    if metadata.value_of(MetadataField::Sequence).is_none() {
        let series_value = metadata.value_of(MetadataField::Series);
        let marker_source = series_value.as_deref().unwrap_or(folder_name);
        if let Some(sequence) = parse_sequence_marker(marker_source) {
            metadata.set(MetadataField::Sequence, &sequence, FieldSource::Derived);
        }
    }
}

/// Extract a trailing `#n` (optionally fractional) marker, e.g.
/// `"Stormlight #2"` → `"2"`.
fn parse_sequence_marker(text: &str) -> Option<String> {
    let hash = text.rfind('#')?;
    let digits: String = text[hash + 1..]
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// Remove a trailing `#n` marker from a derived title candidate.
fn strip_sequence_marker(text: &str) -> String {
    match text.rfind('#') {
        Some(hash) if parse_sequence_marker(text).is_some() => text[..hash].trim().to_string(),
        _ => text.to_string(),
    }
}
