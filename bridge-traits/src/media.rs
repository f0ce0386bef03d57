//! Cover and Chapter Collaborators
//!
//! Pure external helpers with no bearing on the reconciliation state
//! machine: cover-image search/fetch and silence-based chapter detection.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// A cover image candidate from an external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverCandidate {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub provider: Option<String>,
}

/// Searches and fetches cover images.
#[async_trait]
pub trait CoverProvider: Send + Sync {
    async fn search(&self, title: &str, author: Option<&str>) -> Result<Vec<CoverCandidate>>;

    /// Fetch the raw image bytes for a candidate URL.
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// A detected chapter boundary within a single audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMark {
    pub title: Option<String>,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Detects chapter boundaries (e.g., from silence analysis).
#[async_trait]
pub trait ChapterDetector: Send + Sync {
    async fn detect(&self, path: &Path) -> Result<Vec<ChapterMark>>;
}
