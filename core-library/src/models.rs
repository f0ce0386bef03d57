//! # Library Models
//!
//! Books, files, field-level provenance and pending change maps.
//!
//! Every metadata field is a [`Sourced`] value: the value and the
//! provenance that supplied it travel together, so the two can never drift
//! apart. A field explicitly set by the user is `manual` and is never
//! silently overwritten by a lower-precedence source.

use bridge_traits::tags::RawTagSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LibraryError;

/// Genre lists are capped at this many entries by policy.
pub const GENRE_CAP: usize = 3;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for an audio file within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Create a new random file ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a file ID from its string form.
    pub fn from_string(s: &str) -> Result<Self, LibraryError> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| LibraryError::InvalidId(e.to_string()))?,
        ))
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a book group within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Create a new random group ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a group ID from its string form.
    pub fn from_string(s: &str) -> Result<Self, LibraryError> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| LibraryError::InvalidId(e.to_string()))?,
        ))
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Field Provenance
// ============================================================================

/// Which source supplied a field's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSource {
    /// Explicitly entered by the user. Never silently overwritten.
    Manual,
    /// Agreed value from the files' own tags.
    FileTag,
    /// Supplied by an external metadata lookup.
    RemoteLookup,
    /// Inferred (e.g., from the folder name).
    Derived,
}

impl FieldSource {
    /// Precedence rank; higher wins.
    pub fn precedence(&self) -> u8 {
        match self {
            FieldSource::Manual => 3,
            FieldSource::FileTag => 2,
            FieldSource::RemoteLookup => 1,
            FieldSource::Derived => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::Manual => "manual",
            FieldSource::FileTag => "file-tag",
            FieldSource::RemoteLookup => "remote-lookup",
            FieldSource::Derived => "derived",
        }
    }
}

impl std::fmt::Display for FieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value together with the provenance that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: FieldSource,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: FieldSource) -> Self {
        Self { value, source }
    }

    pub fn manual(value: T) -> Self {
        Self::new(value, FieldSource::Manual)
    }

    pub fn is_manual(&self) -> bool {
        self.source == FieldSource::Manual
    }
}

// ============================================================================
// Metadata Fields
// ============================================================================

/// The writable metadata fields of a book.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MetadataField {
    Title,
    Subtitle,
    Author,
    Narrator,
    Series,
    Sequence,
    Genres,
    Publisher,
    Year,
    Description,
    Isbn,
}

impl MetadataField {
    /// All fields, in canonical order.
    pub const ALL: [MetadataField; 11] = [
        MetadataField::Title,
        MetadataField::Subtitle,
        MetadataField::Author,
        MetadataField::Narrator,
        MetadataField::Series,
        MetadataField::Sequence,
        MetadataField::Genres,
        MetadataField::Publisher,
        MetadataField::Year,
        MetadataField::Description,
        MetadataField::Isbn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Title => "title",
            MetadataField::Subtitle => "subtitle",
            MetadataField::Author => "author",
            MetadataField::Narrator => "narrator",
            MetadataField::Series => "series",
            MetadataField::Sequence => "sequence",
            MetadataField::Genres => "genres",
            MetadataField::Publisher => "publisher",
            MetadataField::Year => "year",
            MetadataField::Description => "description",
            MetadataField::Isbn => "isbn",
        }
    }
}

impl FromStr for MetadataField {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(MetadataField::Title),
            "subtitle" => Ok(MetadataField::Subtitle),
            "author" => Ok(MetadataField::Author),
            "narrator" => Ok(MetadataField::Narrator),
            "series" => Ok(MetadataField::Series),
            "sequence" => Ok(MetadataField::Sequence),
            "genres" => Ok(MetadataField::Genres),
            "publisher" => Ok(MetadataField::Publisher),
            "year" => Ok(MetadataField::Year),
            "description" => Ok(MetadataField::Description),
            "isbn" => Ok(MetadataField::Isbn),
            _ => Err(LibraryError::InvalidField(s.to_string())),
        }
    }
}

impl std::fmt::Display for MetadataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Book Metadata
// ============================================================================

/// The merged metadata record of one book.
///
/// Field access goes through [`MetadataField`]-keyed helpers so that the
/// merge, diff and write layers all speak the same string-valued view of a
/// field. Genre values are joined with `", "` in that view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: Option<Sourced<String>>,
    pub subtitle: Option<Sourced<String>>,
    pub author: Option<Sourced<String>>,
    pub narrator: Option<Sourced<String>>,
    pub series: Option<Sourced<String>>,
    pub sequence: Option<Sourced<String>>,
    pub genres: Option<Sourced<Vec<String>>>,
    pub publisher: Option<Sourced<String>>,
    pub year: Option<Sourced<String>>,
    pub description: Option<Sourced<String>>,
    pub isbn: Option<Sourced<String>>,
}

impl BookMetadata {
    /// Current string value of `field`, if any. Genres are joined `", "`.
    pub fn value_of(&self, field: MetadataField) -> Option<String> {
        match field {
            MetadataField::Title => self.title.as_ref().map(|s| s.value.clone()),
            MetadataField::Subtitle => self.subtitle.as_ref().map(|s| s.value.clone()),
            MetadataField::Author => self.author.as_ref().map(|s| s.value.clone()),
            MetadataField::Narrator => self.narrator.as_ref().map(|s| s.value.clone()),
            MetadataField::Series => self.series.as_ref().map(|s| s.value.clone()),
            MetadataField::Sequence => self.sequence.as_ref().map(|s| s.value.clone()),
            MetadataField::Genres => self.genres.as_ref().map(|s| s.value.join(", ")),
            MetadataField::Publisher => self.publisher.as_ref().map(|s| s.value.clone()),
            MetadataField::Year => self.year.as_ref().map(|s| s.value.clone()),
            MetadataField::Description => self.description.as_ref().map(|s| s.value.clone()),
            MetadataField::Isbn => self.isbn.as_ref().map(|s| s.value.clone()),
        }
    }

    /// Provenance of `field`'s current value, if the field is set.
    pub fn source_of(&self, field: MetadataField) -> Option<FieldSource> {
        match field {
            MetadataField::Title => self.title.as_ref().map(|s| s.source),
            MetadataField::Subtitle => self.subtitle.as_ref().map(|s| s.source),
            MetadataField::Author => self.author.as_ref().map(|s| s.source),
            MetadataField::Narrator => self.narrator.as_ref().map(|s| s.source),
            MetadataField::Series => self.series.as_ref().map(|s| s.source),
            MetadataField::Sequence => self.sequence.as_ref().map(|s| s.source),
            MetadataField::Genres => self.genres.as_ref().map(|s| s.source),
            MetadataField::Publisher => self.publisher.as_ref().map(|s| s.source),
            MetadataField::Year => self.year.as_ref().map(|s| s.source),
            MetadataField::Description => self.description.as_ref().map(|s| s.source),
            MetadataField::Isbn => self.isbn.as_ref().map(|s| s.source),
        }
    }

    /// Set `field` to `value` with the given provenance.
    ///
    /// Returns `false` without touching the field when it currently holds a
    /// `manual` value and `source` is anything lower; a user's explicit
    /// edit is never silently overwritten. A genre value is split on commas
    /// and normalized (trimmed, deduplicated, capped at [`GENRE_CAP`]).
    pub fn set(&mut self, field: MetadataField, value: &str, source: FieldSource) -> bool {
        if let Some(existing) = self.source_of(field) {
            if existing == FieldSource::Manual && source != FieldSource::Manual {
                return false;
            }
        }
        if field == MetadataField::Genres {
            let genres = normalize_genres(value.split(','));
            self.genres = Some(Sourced::new(genres, source));
            return true;
        }
        let sourced = Some(Sourced::new(value.trim().to_string(), source));
        match field {
            MetadataField::Title => self.title = sourced,
            MetadataField::Subtitle => self.subtitle = sourced,
            MetadataField::Author => self.author = sourced,
            MetadataField::Narrator => self.narrator = sourced,
            MetadataField::Series => self.series = sourced,
            MetadataField::Sequence => self.sequence = sourced,
            MetadataField::Publisher => self.publisher = sourced,
            MetadataField::Year => self.year = sourced,
            MetadataField::Description => self.description = sourced,
            MetadataField::Isbn => self.isbn = sourced,
            MetadataField::Genres => unreachable!("handled above"),
        }
        true
    }

    /// Set the genre list, normalized and capped, with the given provenance.
    /// Subject to the same manual-protection rule as [`Self::set`].
    pub fn set_genres<I, S>(&mut self, genres: I, source: FieldSource) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(existing) = self.genres.as_ref() {
            if existing.is_manual() && source != FieldSource::Manual {
                return false;
            }
        }
        self.genres = Some(Sourced::new(normalize_genres(genres), source));
        true
    }

    /// All populated fields as a canonical-name → value map. This is the
    /// view handed to the tag writer and the rename template.
    pub fn field_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for field in MetadataField::ALL {
            if let Some(value) = self.value_of(field) {
                map.insert(field.as_str().to_string(), value);
            }
        }
        map
    }
}

/// Trim, drop empties, deduplicate case-insensitively in first-seen order,
/// cap at [`GENRE_CAP`].
pub fn normalize_genres<I, S>(genres: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for genre in genres {
        let trimmed = genre.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(trimmed.to_string());
        if out.len() == GENRE_CAP {
            break;
        }
    }
    out
}

// ============================================================================
// Pending Changes
// ============================================================================

/// An old/new value pair for one field of one file. A field with no change
/// is simply absent from the map: absence means no write will occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}

/// Per-file pending changes, keyed by field. Ordered so that recomputation
/// of identical inputs serializes identically.
pub type ChangeMap = BTreeMap<MetadataField, FieldChange>;

/// Last known tag-write outcome for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum WriteStatus {
    Unwritten,
    Success,
    Failed { reason: String },
}

impl WriteStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteStatus::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WriteStatus::Failed { .. })
    }
}

impl Default for WriteStatus {
    fn default() -> Self {
        WriteStatus::Unwritten
    }
}

// ============================================================================
// Files and Groups
// ============================================================================

/// One scanned audio file. Owned by exactly one [`BookGroup`]; destroyed and
/// rebuilt on rescan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    pub id: FileId,
    pub path: PathBuf,
    pub filename: String,
    /// Tag state as last read from (or written to) disk. Diffs are computed
    /// against this, per file, not against any group average.
    pub tags: RawTagSnapshot,
    pub changes: ChangeMap,
    pub status: WriteStatus,
}

impl AudioFile {
    pub fn new(path: PathBuf, tags: RawTagSnapshot) -> Self {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            id: FileId::new(),
            path,
            filename,
            tags,
            changes: ChangeMap::new(),
            status: WriteStatus::Unwritten,
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Classification of a book group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupType {
    /// A single-file work.
    Single,
    /// A multi-file work split into numbered chapter files.
    Chapters,
    /// A multi-file work whose parts are not chapter-numbered.
    MultiPart,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Single => "single",
            GroupType::Chapters => "chapters",
            GroupType::MultiPart => "multi-part",
        }
    }
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One dissenting value observed while merging a group-uniform field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissentingValue {
    pub value: String,
    pub files: usize,
}

/// A non-fatal intra-group disagreement the merger resolved by majority,
/// surfaced for user review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAmbiguity {
    pub field: MetadataField,
    pub chosen: String,
    pub dissenting: Vec<DissentingValue>,
}

/// The logical work formed from one or more audio files believed to belong
/// together. Exclusively owns its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookGroup {
    pub id: GroupId,
    pub name: String,
    pub group_type: GroupType,
    pub metadata: BookMetadata,
    pub files: Vec<AudioFile>,
    pub ambiguities: Vec<MergeAmbiguity>,
    /// Count of files with at least one pending change. Recomputed by the
    /// store after every mutation; never hand-maintained.
    pub total_changes: usize,
}

impl BookGroup {
    pub fn new(name: impl Into<String>, group_type: GroupType, files: Vec<AudioFile>) -> Self {
        let mut group = Self {
            id: GroupId::new(),
            name: name.into(),
            group_type,
            metadata: BookMetadata::default(),
            files,
            ambiguities: Vec::new(),
            total_changes: 0,
        };
        group.recompute_total_changes();
        group
    }

    /// Recompute `total_changes` from the files' change maps.
    pub fn recompute_total_changes(&mut self) {
        self.total_changes = self.files.iter().filter(|f| f.has_pending_changes()).count();
    }

    pub fn file(&self, id: FileId) -> Option<&AudioFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn file_mut(&mut self, id: FileId) -> Option<&mut AudioFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    /// The path that represents this work toward the catalog: the first file
    /// in natural order.
    pub fn representative_path(&self) -> Option<&Path> {
        self.files.first().map(|f| f.path.as_path())
    }

    /// Build the sync payload unit for this group, if it has any files.
    pub fn sync_item(&self) -> Option<SyncItem> {
        self.representative_path().map(|path| SyncItem {
            path: path.to_string_lossy().into_owned(),
            metadata: self.metadata.clone(),
        })
    }
}

// ============================================================================
// Sync Payload
// ============================================================================

/// The minimal payload unit sent to the remote catalog: one representative
/// file path per group plus the merged metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItem {
    pub path: String,
    pub metadata: BookMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_field_is_never_silently_overwritten() {
        let mut meta = BookMetadata::default();
        assert!(meta.set(MetadataField::Title, "The Stand", FieldSource::Manual));
        assert!(!meta.set(MetadataField::Title, "the stand", FieldSource::FileTag));
        assert!(!meta.set(MetadataField::Title, "The Stand: Uncut", FieldSource::RemoteLookup));
        assert_eq!(meta.value_of(MetadataField::Title).as_deref(), Some("The Stand"));
        assert_eq!(meta.source_of(MetadataField::Title), Some(FieldSource::Manual));

        // A later manual edit still wins.
        assert!(meta.set(MetadataField::Title, "The Stand: Uncut", FieldSource::Manual));
        assert_eq!(
            meta.value_of(MetadataField::Title).as_deref(),
            Some("The Stand: Uncut")
        );
    }

    #[test]
    fn test_lower_precedence_may_fill_unset_fields() {
        let mut meta = BookMetadata::default();
        assert!(meta.set(MetadataField::Author, "B. Sanderson", FieldSource::Derived));
        assert!(meta.set(MetadataField::Author, "Brandon Sanderson", FieldSource::FileTag));
        assert_eq!(meta.source_of(MetadataField::Author), Some(FieldSource::FileTag));
    }

    #[test]
    fn test_genre_cap_dedup_first_seen_order() {
        let merged = normalize_genres([
            "Fantasy ",
            "fantasy",
            "Science Fiction",
            "",
            "Adventure",
            "Mystery",
        ]);
        assert_eq!(merged, vec!["Fantasy", "Science Fiction", "Adventure"]);
    }

    #[test]
    fn test_set_genres_joins_in_value_view() {
        let mut meta = BookMetadata::default();
        meta.set_genres(["Fantasy", "Adventure"], FieldSource::FileTag);
        assert_eq!(
            meta.value_of(MetadataField::Genres).as_deref(),
            Some("Fantasy, Adventure")
        );
    }

    #[test]
    fn test_field_source_precedence_order() {
        assert!(FieldSource::Manual.precedence() > FieldSource::FileTag.precedence());
        assert!(FieldSource::FileTag.precedence() > FieldSource::RemoteLookup.precedence());
        assert!(FieldSource::RemoteLookup.precedence() > FieldSource::Derived.precedence());
    }

    #[test]
    fn test_field_source_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&FieldSource::RemoteLookup).unwrap(),
            "\"remote-lookup\""
        );
        assert_eq!(
            serde_json::to_string(&FieldSource::FileTag).unwrap(),
            "\"file-tag\""
        );
    }

    #[test]
    fn test_group_recomputes_total_changes() {
        let mut file_a = AudioFile::new(PathBuf::from("/books/a/01.mp3"), RawTagSnapshot::default());
        let file_b = AudioFile::new(PathBuf::from("/books/a/02.mp3"), RawTagSnapshot::default());
        file_a.changes.insert(
            MetadataField::Title,
            FieldChange {
                old: "old".into(),
                new: "new".into(),
            },
        );

        let mut group = BookGroup::new("a", GroupType::Chapters, vec![file_a, file_b]);
        assert_eq!(group.total_changes, 1);

        group.files[0].changes.clear();
        group.recompute_total_changes();
        assert_eq!(group.total_changes, 0);
    }

    #[test]
    fn test_sync_item_uses_first_file_path() {
        let files = vec![
            AudioFile::new(PathBuf::from("/books/a/01.mp3"), RawTagSnapshot::default()),
            AudioFile::new(PathBuf::from("/books/a/02.mp3"), RawTagSnapshot::default()),
        ];
        let mut group = BookGroup::new("a", GroupType::Chapters, files);
        group.metadata.set(MetadataField::Title, "A", FieldSource::FileTag);

        let item = group.sync_item().unwrap();
        assert_eq!(item.path, "/books/a/01.mp3");
        assert_eq!(item.metadata.value_of(MetadataField::Title).as_deref(), Some("A"));

        let empty = BookGroup::new("empty", GroupType::Single, Vec::new());
        assert!(empty.sync_item().is_none());
    }

    #[test]
    fn test_metadata_field_round_trips_from_str() {
        for field in MetadataField::ALL {
            assert_eq!(field.as_str().parse::<MetadataField>().unwrap(), field);
        }
        assert!("bitrate".parse::<MetadataField>().is_err());
    }
}
