//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the collaborator traits in
//! `bridge-traits`:
//!
//! - [`LoftyTagStore`]: tag reading/writing with the `lofty` crate
//!   (ID3v2, Vorbis Comments, MP4 atoms, FLAC)
//! - [`HttpCatalogClient`]: catalog access over HTTP with `reqwest`
//! - [`TemplateRenamer`]: metadata-driven filename templates

pub mod catalog;
pub mod rename;
pub mod tags;

pub use catalog::HttpCatalogClient;
pub use rename::{expand_template, TemplateRenamer};
pub use tags::LoftyTagStore;
