//! # Library Domain Model & State
//!
//! The in-memory model of the audiobook library and the single shared
//! mutable resource built on top of it.
//!
//! ## Overview
//!
//! - **Models** (`models`): books, files, field-level provenance, pending
//!   change maps, and the payload types handed to the sync layer
//! - **Store** (`store`): the owned library state with one mutation entry
//!   point and O(1) copy-on-write snapshots for readers
//! - **Selection** (`selection`): which files are picked for the next
//!   operation, with an O(1) "everything" mode
//!
//! The store is the system's only shared mutable state. All mutations go
//! through [`store::LibraryStore::update`], which republishes a fresh
//! snapshot with derived counts recomputed; readers and long-running
//! operations hold immutable snapshots and never block the writer.

pub mod error;
pub mod models;
pub mod selection;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{
    AudioFile, BookGroup, BookMetadata, ChangeMap, DissentingValue, FieldChange, FieldSource,
    FileId, GroupId, GroupType, MergeAmbiguity, MetadataField, Sourced, SyncItem, WriteStatus,
    GENRE_CAP,
};
pub use selection::{Selection, SelectionIndex};
pub use store::{LibraryState, LibraryStore};
