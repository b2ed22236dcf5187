//! Record sources: where bibliographic entries come from.
//!
//! Two backends produce a uniform in-memory `Vec<Record>`:
//! - [`CalibreSource`]: a local Calibre `metadata.db` queried over sqlx
//! - [`ZoteroSource`]: the Zotero Web API v3, paginated
//!
//! Source construction failures are fatal for the run; per-record problems
//! are handled further down the pipeline.

mod calibre;
mod zotero;

pub use calibre::{CalibreSource, DEFAULT_LIBRARY_ANCHOR, TagFilter, TagMatch};
pub use zotero::{ApiItem, Collection, ItemScope, LibraryType, ZoteroClient, ZoteroSource};

use async_trait::async_trait;
use thiserror::Error;

use crate::record::Record;

/// Errors raised while reaching a source or listing its records.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The Calibre database could not be opened or queried.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// The Calibre database file is missing and could not be recovered.
    #[error("Calibre database not found at {path} and not recoverable from Google Drive")]
    DatabaseMissing {
        /// The expected `metadata.db` location.
        path: String,
    },

    /// The remote API could not be reached.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("API returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for display.
        body: String,
    },

    /// The response payload did not match the expected shape.
    #[error("malformed API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O while staging a recovered database copy.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uniform "list the bibliographic records" contract over both backends.
///
/// Implementations return records in their source ordering; that ordering is
/// the one the final document preserves.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches all records this source is configured to expose.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the backing store or API is unreachable;
    /// this is fatal for the run.
    async fn fetch_records(&self) -> Result<Vec<Record>, SourceError>;
}
