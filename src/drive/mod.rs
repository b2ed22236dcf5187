//! Google Drive file index: lookup of sharable links by filename.
//!
//! The pipeline only needs three things from Drive: list files matching a
//! query, fetch a file's content by id (database recovery), and an access
//! probe at startup. [`FileIndex`] is that seam; [`GoogleDriveIndex`] is the
//! REST implementation and tests substitute in-memory fakes.

mod auth;
mod client;
mod resolver;

pub use auth::{AuthError, CredentialProvider, ServiceAccountProvider, StaticTokenProvider};
pub use client::{DriveAbout, GoogleDriveIndex};
pub use resolver::{LinkResolver, ResolvedLinks, SearchOptions, find_file_in_folder};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the cloud file index.
#[derive(Debug, Error)]
pub enum DriveError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Drive API returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for display.
        body: String,
    },

    /// Obtaining a bearer token failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// One file entry as the index returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    /// Web-viewable link; folder entries and some listings omit it.
    pub web_view_link: Option<String>,
}

/// One page of listing results.
#[derive(Debug, Clone, Default)]
pub struct FilePage {
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// A listing request: Drive query syntax plus paging parameters.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    /// Drive search expression, e.g. `name = 'x.pdf' and trashed = false`.
    pub q: String,
    pub page_size: usize,
    pub page_token: Option<String>,
}

/// Narrow interface over the cloud file index.
#[async_trait]
pub trait FileIndex: Send + Sync {
    /// Lists files matching the query, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError`] on network, API, or auth failure.
    async fn list(&self, query: &IndexQuery) -> Result<FilePage, DriveError>;

    /// Downloads a file's content by id.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError`] on network, API, or auth failure.
    async fn fetch_content(&self, file_id: &str) -> Result<Vec<u8>, DriveError>;
}

/// Escapes a value for embedding in a single-quoted Drive query literal.
#[must_use]
pub fn escape_query_value(value: &str) -> String {
    value.replace('\'', "\\'")
}
