//! # File Grouper
//!
//! Partitions a flat list of scanned files into book-unit groups.
//!
//! Files are bucketed by parent directory. A directory whose files agree on
//! author+title (at the 80% threshold) becomes one multi-file group; failing
//! that, filenames sharing a common stem with numeric suffixes form one
//! chapters group; otherwise the directory splits into single-file groups.

use bridge_traits::tags::RawTagSnapshot;
use core_library::models::GroupType;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Share of a directory's files that must agree on author+title for the
/// directory to merge into one group.
const AGREEMENT_THRESHOLD: f64 = 0.8;

/// One discovered file: path plus its raw tag snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProbe {
    pub path: PathBuf,
    pub filename: String,
    pub parent: PathBuf,
    pub tags: RawTagSnapshot,
}

impl FileProbe {
    pub fn new(path: PathBuf, tags: RawTagSnapshot) -> Self {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let parent = path.parent().map(PathBuf::from).unwrap_or_default();
        Self {
            path,
            filename,
            parent,
            tags,
        }
    }
}

/// A proposed group before merging: name, classification and member files
/// in natural order.
#[derive(Debug, Clone)]
pub struct GroupDraft {
    pub name: String,
    pub folder: PathBuf,
    pub group_type: GroupType,
    pub probes: Vec<FileProbe>,
}

/// Folder-adjacency grouper.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileGrouper;

impl FileGrouper {
    pub fn new() -> Self {
        Self
    }

    /// Partition `probes` into group drafts. Deterministic: directories are
    /// visited in path order and files within a group are sorted naturally
    /// (numeric-aware).
    pub fn group(&self, probes: Vec<FileProbe>) -> Vec<GroupDraft> {
        let mut buckets: BTreeMap<PathBuf, Vec<FileProbe>> = BTreeMap::new();
        for probe in probes {
            buckets.entry(probe.parent.clone()).or_default().push(probe);
        }

        let mut drafts = Vec::new();
        for (folder, mut files) in buckets {
            files.sort_by(|a, b| natural_key(&a.filename).cmp(&natural_key(&b.filename)));
            let folder_name = dir_name(&folder);

            if files.len() == 1 {
                drafts.push(single_draft(&folder, files.pop().expect("one file")));
                continue;
            }

            let agreement = tag_agreement(&files);
            let chapter_stem = common_chapter_stem(&files);

            if agreement >= AGREEMENT_THRESHOLD || titles_consistent(&files) {
                let group_type = if chapter_stem.is_some() {
                    GroupType::Chapters
                } else {
                    GroupType::MultiPart
                };
                debug!(folder = %folder.display(), files = files.len(), %group_type, "tag-consistent directory grouped");
                drafts.push(GroupDraft {
                    name: folder_name,
                    folder,
                    group_type,
                    probes: files,
                });
            } else if chapter_stem.is_some() {
                debug!(folder = %folder.display(), files = files.len(), "chapter-stem directory grouped");
                drafts.push(GroupDraft {
                    name: folder_name,
                    folder,
                    group_type: GroupType::Chapters,
                    probes: files,
                });
            } else {
                // Heterogeneous directory: one group per file.
                for file in files {
                    drafts.push(single_draft(&folder, file));
                }
            }
        }
        drafts
    }
}

fn single_draft(folder: &PathBuf, probe: FileProbe) -> GroupDraft {
    GroupDraft {
        name: file_stem(&probe.filename),
        folder: folder.clone(),
        group_type: GroupType::Single,
        probes: vec![probe],
    }
}

/// Largest share of files agreeing on a normalized (author, title) pair.
/// Files missing either tag count against agreement.
fn tag_agreement(files: &[FileProbe]) -> f64 {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for file in files {
        let (Some(author), Some(title)) = (&file.tags.author, &file.tags.title) else {
            continue;
        };
        let key = (
            author.trim().to_lowercase(),
            title.trim().to_lowercase(),
        );
        if key.0.is_empty() || key.1.is_empty() {
            continue;
        }
        *counts.entry(key).or_default() += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);
    best as f64 / files.len() as f64
}

/// True when every file carries the same non-empty title. A directory with
/// consistent titles is one work even when authors disagree below the
/// author+title threshold; the merger resolves the author by majority and
/// flags the dissent.
fn titles_consistent(files: &[FileProbe]) -> bool {
    let mut common: Option<String> = None;
    for file in files {
        let Some(title) = file.tags.title.as_ref() else {
            return false;
        };
        let title = title.trim().to_lowercase();
        if title.is_empty() {
            return false;
        }
        match &common {
            None => common = Some(title),
            Some(existing) if *existing == title => {}
            Some(_) => return false,
        }
    }
    common.is_some()
}

/// The stem shared by every filename once its numeric suffix is stripped,
/// when all filenames carry one. `"Chapter 01.mp3"`/`"Chapter 02.mp3"` →
/// `Some("chapter")`; bare `"01.mp3"`/`"02.mp3"` share the empty stem.
fn common_chapter_stem(files: &[FileProbe]) -> Option<String> {
    let mut common: Option<String> = None;
    for file in files {
        let stem = numeric_suffix_stem(&file.filename)?;
        match &common {
            None => common = Some(stem),
            Some(existing) if *existing == stem => {}
            Some(_) => return None,
        }
    }
    common
}

/// Strip extension and a required trailing digit run (plus separators) from
/// a filename, lowercased. `None` when there is no trailing digit run.
fn numeric_suffix_stem(filename: &str) -> Option<String> {
    let stem = file_stem(filename);
    let trimmed = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.len() == stem.len() {
        return None;
    }
    Some(
        trimmed
            .trim_end_matches([' ', '-', '_', '.', '('])
            .to_lowercase(),
    )
}

fn file_stem(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => filename.to_string(),
    }
}

fn dir_name(folder: &PathBuf) -> String {
    folder
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Numeric-aware sort key: digit runs compare as numbers, text runs
/// case-insensitively.
fn natural_key(name: &str) -> Vec<NaturalPart> {
    let mut parts = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();
    for c in name.chars() {
        if c.is_ascii_digit() {
            if !text.is_empty() {
                parts.push(NaturalPart::Text(std::mem::take(&mut text).to_lowercase()));
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                let value = digits.parse().unwrap_or(u64::MAX);
                parts.push(NaturalPart::Number(value));
                digits.clear();
            }
            text.push(c);
        }
    }
    if !digits.is_empty() {
        parts.push(NaturalPart::Number(digits.parse().unwrap_or(u64::MAX)));
    }
    if !text.is_empty() {
        parts.push(NaturalPart::Text(text.to_lowercase()));
    }
    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalPart {
    Number(u64),
    Text(String),
}
