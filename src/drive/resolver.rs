//! Filename-to-link resolution over a [`FileIndex`].
//!
//! The search runs in two phases because a plain name query does not
//! uniformly return items shared with the caller: first the scoped (or
//! global) query is paged through, then, only when not folder-scoped and
//! still short of the requested count, a `sharedWithMe` query is merged in,
//! deduplicated by file id.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{DriveError, DriveFile, FileIndex, IndexQuery, escape_query_value};

/// MIME type Drive uses for folders.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Result cap when the caller wants every match.
const MAX_RESULTS_ALL: usize = 10;

/// How a single resolution call should search.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Substring containment instead of exact name equality.
    pub contains: bool,
    /// Constrain the search to children of this folder (first exact name
    /// match wins). Folder scoping disables the shared-with-me merge.
    pub folder_name: Option<String>,
    /// Return every match (up to an internal cap) instead of the first.
    pub return_all: bool,
}

/// Outcome of a resolution: zero, one, or many links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLinks {
    Absent,
    One(String),
    Many(Vec<String>),
}

impl ResolvedLinks {
    /// The first link, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::One(link) => Some(link),
            Self::Many(links) => links.first().map(String::as_str),
        }
    }
}

/// Resolves filenames to sharable links; all failures degrade to "absent".
#[derive(Clone)]
pub struct LinkResolver {
    index: Arc<dyn FileIndex>,
}

impl LinkResolver {
    #[must_use]
    pub fn new(index: Arc<dyn FileIndex>) -> Self {
        Self { index }
    }

    /// Looks up `filename` in the index.
    ///
    /// Never fails: index errors are logged to the error stream and reported
    /// as [`ResolvedLinks::Absent`], so one bad lookup cannot take down a
    /// record's rendering.
    pub async fn resolve(&self, filename: &str, options: &SearchOptions) -> ResolvedLinks {
        let safe_name = escape_query_value(filename);
        let query = if options.contains {
            format!("name contains '{safe_name}' and trashed = false")
        } else {
            format!("name = '{safe_name}' and trashed = false")
        };
        let max_results = if options.return_all { MAX_RESULTS_ALL } else { 1 };

        let files = match search_files(
            self.index.as_ref(),
            &query,
            max_results,
            options.folder_name.as_deref(),
            true,
        )
        .await
        {
            Ok(files) => files,
            Err(error) => {
                warn!(filename, error = %error, "Drive lookup failed, emitting attachment without link");
                return ResolvedLinks::Absent;
            }
        };

        debug!(filename, matches = files.len(), "Drive lookup finished");

        if files.is_empty() {
            return ResolvedLinks::Absent;
        }
        if options.return_all {
            // Entries without a link field are dropped.
            let links: Vec<String> = files.into_iter().filter_map(|f| f.web_view_link).collect();
            if links.is_empty() {
                ResolvedLinks::Absent
            } else {
                ResolvedLinks::Many(links)
            }
        } else {
            match files.into_iter().next().and_then(|f| f.web_view_link) {
                Some(link) => ResolvedLinks::One(link),
                None => ResolvedLinks::Absent,
            }
        }
    }
}

/// Pages through the index until `max_results` matches are collected,
/// optionally folder-scoped, merging shared-with-me matches when allowed.
///
/// # Errors
///
/// Returns [`DriveError`] when a listing request fails.
pub(crate) async fn search_files(
    index: &dyn FileIndex,
    query: &str,
    max_results: usize,
    folder_name: Option<&str>,
    include_shared: bool,
) -> Result<Vec<DriveFile>, DriveError> {
    let folder_id = match folder_name {
        Some(name) => find_folder_id(index, name).await?,
        None => None,
    };
    let query = match &folder_id {
        Some(id) => format!("{query} and '{id}' in parents"),
        None => query.to_string(),
    };

    let mut results: Vec<DriveFile> = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = index
            .list(&IndexQuery {
                q: query.clone(),
                page_size: max_results,
                page_token: page_token.clone(),
            })
            .await?;
        results.extend(page.files);

        // The plain query misses files merely shared with the caller.
        if include_shared && results.len() < max_results && folder_id.is_none() {
            let shared = index
                .list(&IndexQuery {
                    q: format!("{query} and sharedWithMe=true"),
                    page_size: max_results - results.len(),
                    page_token: None,
                })
                .await?;
            for file in shared.files {
                if !results.iter().any(|existing| existing.id == file.id) {
                    results.push(file);
                }
            }
        }

        page_token = page.next_page_token;
        if page_token.is_none() || results.len() >= max_results {
            break;
        }
    }
    results.truncate(max_results);
    Ok(results)
}

/// Finds a folder's id by exact name; first match wins.
async fn find_folder_id(
    index: &dyn FileIndex,
    folder_name: &str,
) -> Result<Option<String>, DriveError> {
    let safe_name = escape_query_value(folder_name);
    let page = index
        .list(&IndexQuery {
            q: format!(
                "name = '{safe_name}' and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false"
            ),
            page_size: 1,
            page_token: None,
        })
        .await?;
    Ok(page.files.into_iter().next().map(|f| f.id))
}

/// Finds one file by exact name inside a named folder, falling back to a
/// global exact-name search when the folder does not exist.
///
/// Used to recover a library database from its synced Drive folder.
///
/// # Errors
///
/// Returns [`DriveError`] when a listing request fails.
pub async fn find_file_in_folder(
    index: &dyn FileIndex,
    filename: &str,
    folder_name: &str,
) -> Result<Option<DriveFile>, DriveError> {
    let safe_name = escape_query_value(filename);
    let query = format!("name = '{safe_name}' and trashed = false");
    let scoped = search_files(index, &query, 1, Some(folder_name), false).await?;
    if let Some(file) = scoped.into_iter().next() {
        return Ok(Some(file));
    }
    let global = search_files(index, &query, 1, None, false).await?;
    Ok(global.into_iter().next())
}
