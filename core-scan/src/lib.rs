//! # Scan & Grouping
//!
//! Turns directories of audio files into [`core_library::models::BookGroup`]s.
//!
//! ## Overview
//!
//! - **Grouper** (`grouper`): partitions discovered files into book-unit
//!   groups using folder adjacency, tag agreement and filename heuristics
//! - **Scanner** (`scanner`): walks the filesystem, reads tags with a
//!   bounded worker pool, exposes a pollable progress snapshot, observes
//!   cooperative cancellation, and hands each group through the merger and
//!   change tracker
//!
//! A file that cannot be read is excluded from all groups and reported in
//! the scan warning list; it never aborts the scan.

pub mod error;
pub mod grouper;
pub mod scanner;

pub use error::{Result, ScanError};
pub use grouper::{FileGrouper, FileProbe, GroupDraft};
pub use scanner::{ScanConfig, ScanCoordinator, ScanProgress, ScanReport, ScanWarning};
