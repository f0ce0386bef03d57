//! Collaborator Trait Definitions
//!
//! Platform- and vendor-agnostic traits for every external capability the
//! reconciliation core consumes: audio tag I/O, remote metadata lookup, the
//! catalog service, file renaming, and cover/chapter helpers.
//!
//! The core never touches audio bytes or the network directly. It calls these
//! traits as opaque asynchronous operations that accept a file path (or set of
//! paths) and metadata, and return structured results or raw payloads. Hosts
//! provide implementations (see `bridge-desktop` for the desktop set) and the
//! core stays testable with in-memory fakes.

pub mod catalog;
pub mod error;
pub mod lookup;
pub mod media;
pub mod rename;
pub mod tags;

pub use catalog::{CatalogBatchOutcome, CatalogClient, CatalogFailure, CatalogPayload};
pub use error::{BridgeError, Result};
pub use lookup::{MetadataLookup, RemoteLookupResult};
pub use media::{ChapterDetector, ChapterMark, CoverCandidate, CoverProvider};
pub use rename::{RenameFailure, RenameOutcome, RenamePlan, Renamer};
pub use tags::{RawTagSnapshot, TagReader, TagWriter};
