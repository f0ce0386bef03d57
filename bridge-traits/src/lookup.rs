//! Remote Metadata Lookup Abstraction
//!
//! A lookup provider resolves a (title, author) query against an external
//! source and returns candidate records. The merger treats a candidate as a
//! `remote-lookup` provenance layer; it never displaces manual edits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One candidate record returned by a lookup provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLookupResult {
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
    /// Cover image URL, if the provider carries one. Fetched separately via
    /// [`crate::media::CoverProvider`]; the reconciliation core ignores it.
    pub cover_url: Option<String>,
}

/// Queries an external metadata source.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Search for records matching `title` (and `author`, when known).
    /// Results are ordered by provider relevance, best match first.
    async fn lookup(&self, title: &str, author: Option<&str>)
        -> Result<Vec<RemoteLookupResult>>;
}
