//! Remote Catalog Abstraction
//!
//! The catalog is the external service holding the canonical library record.
//! The sync orchestrator submits updates in bounded chunks; the catalog
//! upserts by identity (re-submitting the same item after a partial failure
//! is safe) and addresses works by a representative file path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Wire payload for one work. One representative file path per work; the
/// catalog resolves the path to its own entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPayload {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

/// An item the catalog attempted but failed to update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of one batch call.
///
/// `unmatched` lists paths the catalog could not resolve to an existing
/// entry, a normal outcome rather than an error. Items may also be silently
/// skipped by the remote side, so
/// `updated + unmatched.len() + failed.len()` can be less than the number
/// of items submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBatchOutcome {
    pub updated: u64,
    #[serde(default)]
    pub unmatched: Vec<String>,
    #[serde(default)]
    pub failed: Vec<CatalogFailure>,
}

/// Client for the remote catalog service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Verify the catalog is reachable. Called once before a batch run;
    /// failure here is the single fatal error of a sync operation.
    async fn connect(&self) -> Result<()>;

    /// Submit one chunk of updates.
    ///
    /// # Errors
    ///
    /// A transport-level error means the whole chunk's fate is unknown;
    /// callers mark every item of the chunk failed and continue with the
    /// next chunk.
    async fn push_updates(&self, items: &[CatalogPayload]) -> Result<CatalogBatchOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_omits_empty_fields_on_the_wire() {
        let payload = CatalogPayload {
            path: "/books/a/01.mp3".to_string(),
            title: Some("T".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"path":"/books/a/01.mp3","title":"T"}"#);
    }

    #[test]
    fn test_outcome_decodes_with_missing_lists() {
        let outcome: CatalogBatchOutcome = serde_json::from_str(r#"{"updated":3}"#).unwrap();
        assert_eq!(outcome.updated, 3);
        assert!(outcome.unmatched.is_empty());
        assert!(outcome.failed.is_empty());
    }
}
