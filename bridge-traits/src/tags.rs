//! Audio Tag I/O Abstractions
//!
//! Traits for reading a file's current tag state and for writing confirmed
//! field values back. Implementations own all format concerns (ID3v2, Vorbis
//! Comments, MP4 atoms); the core only sees string-valued fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// A file's tag state as last read from disk.
///
/// All fields are optional: audiobook rips in the wild carry anything from a
/// full tag set to nothing at all. Values are normalized by the reader
/// (trimmed, control characters stripped) so that equal content compares equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTagSnapshot {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub narrator: Option<String>,
    pub series: Option<String>,
    pub sequence: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub publisher: Option<String>,
    pub year: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    /// Track number within the work, when the rip numbers its parts.
    pub track_number: Option<u32>,
    /// Playback length, when the container reports one.
    pub duration_secs: Option<u64>,
}

impl RawTagSnapshot {
    /// True when no text field carries a value.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subtitle.is_none()
            && self.author.is_none()
            && self.narrator.is_none()
            && self.series.is_none()
            && self.sequence.is_none()
            && self.genres.is_empty()
            && self.publisher.is_none()
            && self.year.is_none()
            && self.description.is_none()
            && self.isbn.is_none()
    }
}

/// Reads the current tag state of an audio file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Read and normalize the tags of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a parseable
    /// audio container. Callers treat this as a per-file condition and must
    /// not abort sibling files.
    async fn read_tags(&self, path: &Path) -> Result<RawTagSnapshot>;
}

/// Writes confirmed field values into an audio file's tags.
#[async_trait]
pub trait TagWriter: Send + Sync {
    /// Write `fields` (canonical field name → new value) into the file at
    /// `path`. Fields absent from the map are left untouched. When `backup`
    /// is set, a copy of the original file is kept next to it before the
    /// first byte is modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be rewritten. The error covers
    /// this file only; callers record it and continue with the batch.
    async fn write_tags(
        &self,
        path: &Path,
        fields: &BTreeMap<String, String>,
        backup: bool,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reader_is_usable_as_a_trait_object() {
        let mut mock = MockTagReader::new();
        mock.expect_read_tags().returning(|_| {
            Ok(RawTagSnapshot {
                title: Some("T".into()),
                ..Default::default()
            })
        });

        let reader: Arc<dyn TagReader> = Arc::new(mock);
        let snapshot = reader.read_tags(Path::new("/books/x.mp3")).await.unwrap();
        assert_eq!(snapshot.title.as_deref(), Some("T"));
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_empty_snapshot_reports_empty() {
        assert!(RawTagSnapshot::default().is_empty());
    }
}
