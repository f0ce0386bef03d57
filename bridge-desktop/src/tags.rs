//! Audio Tag I/O via `lofty`
//!
//! Implements [`TagReader`] and [`TagWriter`] with the audiobook tag
//! conventions common to rips in the wild:
//!
//! - book title in the album tag (track titles stay chapter names)
//! - author in the artist tag (album artist as fallback)
//! - narrator in the composer tag
//! - series and sequence combined in the content-group tag as
//!   `"Series #n"`
//! - publisher in the label tag, description in the comment tag
//!
//! Subtitle and ISBN have no portable tag mapping; they live in memory and
//! in the catalog only.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::tags::{RawTagSnapshot, TagReader, TagWriter};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::{AudioFile as _, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tag reader/writer backed by `lofty`.
pub struct LoftyTagStore {
    parse_options: ParseOptions,
}

impl LoftyTagStore {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Normalize tag text: collapse whitespace, strip control characters.
    fn normalize_text(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .filter(|c| !c.is_control())
            .collect()
    }

    fn snapshot_from_tag(tag: &Tag) -> RawTagSnapshot {
        let norm = |s: &str| Self::normalize_text(s);
        let get = |key: &ItemKey| tag.get_string(key).map(norm).filter(|s| !s.is_empty());

        let title = tag
            .album()
            .map(|s| norm(s.as_ref()))
            .filter(|s| !s.is_empty())
            .or_else(|| tag.title().map(|s| norm(s.as_ref())).filter(|s| !s.is_empty()));
        let author = tag
            .artist()
            .map(|s| norm(s.as_ref()))
            .filter(|s| !s.is_empty())
            .or_else(|| get(&ItemKey::AlbumArtist));

        let (series, sequence) = match get(&ItemKey::ContentGroup) {
            Some(group) => parse_series_group(&group),
            None => (None, None),
        };

        let genres = tag
            .genre()
            .map(|g| split_genres(g.as_ref()))
            .unwrap_or_default();

        let year = get(&ItemKey::RecordingDate)
            .or_else(|| get(&ItemKey::Year))
            .or_else(|| tag.year().map(|y| y.to_string()));

        RawTagSnapshot {
            title,
            subtitle: None,
            author,
            narrator: get(&ItemKey::Composer),
            series,
            sequence,
            genres,
            publisher: get(&ItemKey::Label),
            year,
            description: tag
                .comment()
                .map(|s| norm(s.as_ref()))
                .filter(|s| !s.is_empty()),
            isbn: None,
            track_number: tag.track(),
            duration_secs: None,
        }
    }
}

impl Default for LoftyTagStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagReader for LoftyTagStore {
    async fn read_tags(&self, path: &Path) -> Result<RawTagSnapshot> {
        debug!(path = %path.display(), "reading tags");
        let data = tokio::fs::read(path).await.map_err(|e| BridgeError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let tagged_file = Probe::new(std::io::Cursor::new(&data))
            .options(self.parse_options)
            .guess_file_type()
            .map_err(|e| BridgeError::TagRead {
                path: path.display().to_string(),
                message: format!("failed to probe file: {e}"),
            })?
            .read()
            .map_err(|e| BridgeError::TagRead {
                path: path.display().to_string(),
                message: format!("failed to parse file: {e}"),
            })?;

        let duration_secs = tagged_file.properties().duration().as_secs();
        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let mut snapshot = match tag {
            Some(tag) => Self::snapshot_from_tag(tag),
            None => {
                warn!(path = %path.display(), "no tags found; empty snapshot");
                RawTagSnapshot::default()
            }
        };
        snapshot.duration_secs = Some(duration_secs);
        Ok(snapshot)
    }
}

#[async_trait]
impl TagWriter for LoftyTagStore {
    async fn write_tags(
        &self,
        path: &Path,
        fields: &BTreeMap<String, String>,
        backup: bool,
    ) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        if backup {
            let backup_path = backup_path_for(path);
            tokio::fs::copy(path, &backup_path)
                .await
                .map_err(|e| BridgeError::Io {
                    path: path.display().to_string(),
                    message: format!("backup failed: {e}"),
                })?;
            debug!(path = %path.display(), backup = %backup_path.display(), "backup written");
        }

        let path_buf = path.to_path_buf();
        let fields = fields.clone();
        let parse_options = self.parse_options;
        tokio::task::spawn_blocking(move || write_tags_blocking(&path_buf, &fields, parse_options))
            .await
            .map_err(|e| BridgeError::TagWrite {
                path: path.display().to_string(),
                message: format!("write task failed: {e}"),
            })?
    }
}

/// Sibling backup path: `book.mp3` → `book.mp3.bak`.
fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn write_tags_blocking(
    path: &Path,
    fields: &BTreeMap<String, String>,
    parse_options: ParseOptions,
) -> Result<()> {
    let tag_write_err = |message: String| BridgeError::TagWrite {
        path: path.display().to_string(),
        message,
    };

    let mut tagged_file = Probe::open(path)
        .map_err(|e| tag_write_err(format!("failed to open file: {e}")))?
        .options(parse_options)
        .read()
        .map_err(|e| tag_write_err(format!("failed to parse file: {e}")))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| tag_write_err("no writable tag".into()))?;

    // Series and sequence share the content-group tag; overlay the changed
    // half onto whatever the tag currently holds.
    let (current_series, current_sequence) = tag
        .get_string(&ItemKey::ContentGroup)
        .map(parse_series_group)
        .unwrap_or((None, None));
    let mut series = current_series;
    let mut sequence = current_sequence;
    let mut series_touched = false;

    for (field, value) in fields {
        let value = value.trim();
        match field.as_str() {
            "title" => set_or_remove(tag, ItemKey::AlbumTitle, value),
            "author" => {
                set_or_remove(tag, ItemKey::TrackArtist, value);
                set_or_remove(tag, ItemKey::AlbumArtist, value);
            }
            "narrator" => set_or_remove(tag, ItemKey::Composer, value),
            "genres" => set_or_remove(tag, ItemKey::Genre, value),
            "publisher" => set_or_remove(tag, ItemKey::Label, value),
            "year" => {
                set_or_remove(tag, ItemKey::RecordingDate, value);
                set_or_remove(tag, ItemKey::Year, value);
            }
            "description" => set_or_remove(tag, ItemKey::Comment, value),
            "series" => {
                series = non_empty(value);
                series_touched = true;
            }
            "sequence" => {
                sequence = non_empty(value);
                series_touched = true;
            }
            // Subtitle and ISBN have no portable mapping.
            "subtitle" | "isbn" => {}
            other => {
                warn!(field = other, "unknown tag field skipped");
            }
        }
    }

    if series_touched {
        let group = compose_series_group(series.as_deref(), sequence.as_deref());
        set_or_remove(tag, ItemKey::ContentGroup, &group);
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| tag_write_err(format!("failed to save tags: {e}")))
}

fn set_or_remove(tag: &mut Tag, key: ItemKey, value: &str) {
    if value.is_empty() {
        tag.remove_key(&key);
    } else {
        tag.insert_text(key, value.to_string());
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split a `"Series #n"` content-group value into its halves.
fn parse_series_group(group: &str) -> (Option<String>, Option<String>) {
    match group.rsplit_once('#') {
        Some((series, sequence)) if !sequence.trim().is_empty() => {
            let series = series.trim();
            (
                if series.is_empty() {
                    None
                } else {
                    Some(series.to_string())
                },
                Some(sequence.trim().to_string()),
            )
        }
        _ => {
            let trimmed = group.trim();
            if trimmed.is_empty() {
                (None, None)
            } else {
                (Some(trimmed.to_string()), None)
            }
        }
    }
}

fn compose_series_group(series: Option<&str>, sequence: Option<&str>) -> String {
    match (series, sequence) {
        (Some(series), Some(sequence)) => format!("{series} #{sequence}"),
        (Some(series), None) => series.to_string(),
        (None, Some(sequence)) => format!("#{sequence}"),
        (None, None) => String::new(),
    }
}

/// Split a genre tag on the separators seen in the wild.
fn split_genres(genre: &str) -> Vec<String> {
    genre
        .split(['/', ';', ','])
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series_group() {
        assert_eq!(
            parse_series_group("Stormlight Archive #2"),
            (Some("Stormlight Archive".into()), Some("2".into()))
        );
        assert_eq!(
            parse_series_group("Standalone Series"),
            (Some("Standalone Series".into()), None)
        );
        assert_eq!(parse_series_group("  "), (None, None));
        assert_eq!(parse_series_group("#1.5"), (None, Some("1.5".into())));
    }

    #[test]
    fn test_compose_series_group_round_trips() {
        let composed = compose_series_group(Some("Dune"), Some("3"));
        assert_eq!(composed, "Dune #3");
        assert_eq!(
            parse_series_group(&composed),
            (Some("Dune".into()), Some("3".into()))
        );
    }

    #[test]
    fn test_split_genres_on_common_separators() {
        assert_eq!(
            split_genres("Fantasy/Adventure; Epic"),
            vec!["Fantasy", "Adventure", "Epic"]
        );
        assert_eq!(split_genres(""), Vec::<String>::new());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            LoftyTagStore::normalize_text("  The   Long\tWalk "),
            "The Long Walk"
        );
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path_for(Path::new("/books/a/book.mp3")),
            PathBuf::from("/books/a/book.mp3.bak")
        );
    }
}
