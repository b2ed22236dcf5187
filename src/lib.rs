//! Shelflist Core Library
//!
//! Exports bibliographic listings from a local Calibre library or a remote
//! Zotero library, optionally enriching each entry's attachments with
//! matching Google Drive links, and renders the result as text, HTML, or
//! PDF.
//!
//! # Architecture
//!
//! The pipeline runs left to right through these modules:
//! - [`source`] - record sources (Calibre SQLite, Zotero Web API)
//! - [`attach`] - per-record attachment location
//! - [`drive`] - Google Drive index, auth, and filename-to-link resolution
//! - [`render`] - concurrent per-record formatting, order-preserving
//! - [`output`] - document emission (text/HTML/PDF, file or stdout)
//!
//! [`record`] holds the uniform record model the stages exchange.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attach;
pub mod drive;
pub mod output;
pub mod record;
pub mod render;
pub mod source;

// Re-export commonly used types
pub use attach::{AttachmentLocator, CalibreLocator, ZoteroLocator};
pub use drive::{
    CredentialProvider, DriveError, FileIndex, GoogleDriveIndex, LinkResolver, ResolvedLinks,
    SearchOptions, ServiceAccountProvider, StaticTokenProvider,
};
pub use output::{OutputError, OutputFormat, PdfBackend, select_backend};
pub use record::{Record, RecordDetails, StorageRef};
pub use render::{
    HtmlFormatter, RecordFormatter, RenderedFragment, TextFormatter, assemble_html_document,
    assemble_text_document, render_all,
};
pub use source::{
    CalibreSource, Collection, ItemScope, LibraryType, RecordSource, SourceError, TagFilter,
    TagMatch, ZoteroClient, ZoteroSource,
};
