//! # Metadata Merge & Change Tracking
//!
//! Combines per-file tag data and external lookups into one authoritative
//! metadata record per group, and computes the field-level diffs each file
//! will receive when its tags are written.
//!
//! ## Components
//!
//! - **Merger** (`merger`): source-precedence merge with majority-vote
//!   conflict resolution and surfaced ambiguities
//! - **Change Tracker** (`changes`): pure, idempotent recomputation of
//!   per-file change maps against each file's own stale tag snapshot

pub mod changes;
pub mod error;
pub mod merger;

pub use changes::{tag_value, ChangeTracker};
pub use error::{MetadataError, Result};
pub use merger::{MergeOutcome, MetadataMerger};
