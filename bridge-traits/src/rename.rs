//! File Rename Abstraction
//!
//! Renaming is a two-phase collaborator operation: `preview` expands a
//! filename template against a file's metadata without touching the disk,
//! `confirm` applies a reviewed set of plans.
//!
//! Template placeholders: `{author}`, `{title}`, `{series}`, `{sequence}`,
//! `{year}`, `{narrator}`. A bracket group `[...]` is omitted entirely when
//! any placeholder it references expands to an empty value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One proposed rename, produced by `preview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePlan {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// False when the template expands to the current name already.
    pub changed: bool,
}

/// A rename that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a confirmed rename batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub renamed: u64,
    #[serde(default)]
    pub errors: Vec<RenameFailure>,
}

/// Renames audio files from a metadata-driven template.
#[async_trait]
pub trait Renamer: Send + Sync {
    /// Expand `template` against `fields` (canonical field name → value) and
    /// propose a new name for the file at `path`. Pure with respect to the
    /// filesystem.
    async fn preview(
        &self,
        path: &Path,
        fields: &BTreeMap<String, String>,
        template: &str,
    ) -> Result<RenamePlan>;

    /// Apply the plans whose `changed` flag is set. Per-file failures are
    /// collected in the outcome; they never abort the batch.
    async fn confirm(&self, plans: &[RenamePlan]) -> Result<RenameOutcome>;
}
