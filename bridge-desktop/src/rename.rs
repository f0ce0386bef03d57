//! Filename Template Renamer
//!
//! Expands templates like `"{author} - {title} [{series} #{sequence}]"`
//! against a file's metadata. A bracket group vanishes entirely when any
//! placeholder inside it is empty, so optional fields never leave stray
//! separators behind. Expanded values are sanitized for illegal path
//! characters.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::rename::{RenameFailure, RenameOutcome, RenamePlan, Renamer};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Characters not allowed in a filename component on any supported
/// platform.
const ILLEGAL_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Expand `template` against `fields` (canonical field name → value).
///
/// `{name}` is replaced by the sanitized field value (empty when the field
/// is absent). A `[...]` group is emitted only when every placeholder it
/// references expanded non-empty. Whitespace runs left by dropped groups
/// collapse to single spaces.
pub fn expand_template(template: &str, fields: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let mut group: Option<(String, bool)> = None; // buffer, saw-empty-placeholder
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' if group.is_none() => group = Some((String::new(), false)),
            ']' if group.is_some() => {
                let (buffer, saw_empty) = group.take().expect("group open");
                if !saw_empty {
                    out.push_str(&buffer);
                }
            }
            '{' => {
                let mut name = String::new();
                for n in chars.by_ref() {
                    if n == '}' {
                        break;
                    }
                    name.push(n);
                }
                let value = fields
                    .get(name.trim())
                    .map(|v| sanitize_component(v))
                    .unwrap_or_default();
                match &mut group {
                    Some((buffer, saw_empty)) => {
                        if value.is_empty() {
                            *saw_empty = true;
                        }
                        buffer.push_str(&value);
                    }
                    None => out.push_str(&value),
                }
            }
            _ => match &mut group {
                Some((buffer, _)) => buffer.push(c),
                None => out.push(c),
            },
        }
    }
    // An unclosed group keeps its content; a template typo should not eat
    // the filename.
    if let Some((buffer, saw_empty)) = group {
        if !saw_empty {
            out.push_str(&buffer);
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip illegal filename characters and control characters.
fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Template-driven renamer over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenamer;

impl TemplateRenamer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renamer for TemplateRenamer {
    async fn preview(
        &self,
        path: &Path,
        fields: &BTreeMap<String, String>,
        template: &str,
    ) -> Result<RenamePlan> {
        let expanded = expand_template(template, fields);
        if expanded.is_empty() {
            return Err(BridgeError::Rename {
                path: path.display().to_string(),
                message: "template expanded to an empty name".into(),
            });
        }
        let file_name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{expanded}.{ext}"),
            None => expanded,
        };
        let new_path = path.parent().unwrap_or_else(|| Path::new("")).join(file_name);
        Ok(RenamePlan {
            old_path: path.to_path_buf(),
            changed: new_path != path,
            new_path,
        })
    }

    async fn confirm(&self, plans: &[RenamePlan]) -> Result<RenameOutcome> {
        let mut outcome = RenameOutcome::default();
        for plan in plans.iter().filter(|p| p.changed) {
            if tokio::fs::try_exists(&plan.new_path).await.unwrap_or(false) {
                warn!(target_path = %plan.new_path.display(), "rename target already exists");
                outcome.errors.push(RenameFailure {
                    path: plan.old_path.clone(),
                    reason: format!("target already exists: {}", plan.new_path.display()),
                });
                continue;
            }
            match tokio::fs::rename(&plan.old_path, &plan.new_path).await {
                Ok(()) => {
                    debug!(from = %plan.old_path.display(), to = %plan.new_path.display(), "renamed");
                    outcome.renamed += 1;
                }
                Err(e) => outcome.errors.push(RenameFailure {
                    path: plan.old_path.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_basic_expansion() {
        let fields = fields(&[("author", "Jane Doe"), ("title", "The Long Walk")]);
        assert_eq!(
            expand_template("{author} - {title}", &fields),
            "Jane Doe - The Long Walk"
        );
    }

    #[test]
    fn test_bracket_group_dropped_when_field_empty() {
        let with_series = fields(&[
            ("author", "A"),
            ("title", "T"),
            ("series", "S"),
            ("sequence", "2"),
        ]);
        let without_series = fields(&[("author", "A"), ("title", "T")]);
        let template = "{author} - {title} [({series} #{sequence})]";

        assert_eq!(expand_template(template, &with_series), "A - T (S #2)");
        assert_eq!(expand_template(template, &without_series), "A - T");
    }

    #[test]
    fn test_illegal_characters_are_stripped() {
        let fields = fields(&[("title", "What? A \"Test\": Part 1/2")]);
        assert_eq!(expand_template("{title}", &fields), "What A Test Part 12");
    }

    #[test]
    fn test_unknown_placeholder_expands_empty() {
        let fields = fields(&[("title", "T")]);
        assert_eq!(expand_template("{title} {bitrate}", &fields), "T");
    }

    #[test]
    fn test_unclosed_group_keeps_content() {
        let fields = fields(&[("title", "T"), ("year", "1999")]);
        assert_eq!(expand_template("{title} [{year}", &fields), "T 1999");
    }

    #[tokio::test]
    async fn test_preview_keeps_extension_and_flags_unchanged_names() {
        let renamer = TemplateRenamer::new();
        let fields = fields(&[("author", "A"), ("title", "T")]);

        let plan = renamer
            .preview(Path::new("/books/x/old.m4b"), &fields, "{author} - {title}")
            .await
            .unwrap();
        assert_eq!(plan.new_path, PathBuf::from("/books/x/A - T.m4b"));
        assert!(plan.changed);

        let same = renamer
            .preview(Path::new("/books/x/A - T.m4b"), &fields, "{author} - {title}")
            .await
            .unwrap();
        assert!(!same.changed);
    }

    #[tokio::test]
    async fn test_confirm_renames_on_disk_and_collects_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let old = dir.path().join("old.mp3");
        std::fs::File::create(&old).unwrap();
        let new = dir.path().join("new.mp3");

        let missing = dir.path().join("missing.mp3");
        let plans = vec![
            RenamePlan {
                old_path: old.clone(),
                new_path: new.clone(),
                changed: true,
            },
            RenamePlan {
                old_path: missing.clone(),
                new_path: dir.path().join("elsewhere.mp3"),
                changed: true,
            },
        ];

        let renamer = TemplateRenamer::new();
        let outcome = renamer.confirm(&plans).await.unwrap();

        assert_eq!(outcome.renamed, 1);
        assert!(new.exists());
        assert!(!old.exists());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].path, missing);
    }
}
