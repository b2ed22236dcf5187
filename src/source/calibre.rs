//! Calibre library source: read-only queries against `metadata.db`.
//!
//! Calibre owns the schema; this module only reads it. When the database file
//! is absent the source can recover a copy from Google Drive (a library
//! synced to Drive keeps `metadata.db` inside its library folder) before
//! giving up.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, instrument, warn};

use super::{RecordSource, SourceError};
use crate::drive::FileIndex;
use crate::record::{BookFields, FormatEntry, Record, RecordDetails, StorageRef};

/// Filename of the Calibre database inside a library folder.
const METADATA_DB: &str = "metadata.db";

/// Default Drive folder name a synced Calibre library lives in. Also the
/// anchor directory used when shortening emitted attachment paths.
pub const DEFAULT_LIBRARY_ANCHOR: &str = "Calibre Library";

/// How a tag filter value is compared against a book's tags.
///
/// All modes compare case-insensitively. This replaces the legacy
/// bidirectional substring rule with an explicit, caller-chosen mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TagMatch {
    /// Filter value equals the tag.
    Exact,
    /// Filter value is contained in the tag.
    #[default]
    Substring,
    /// The tag starts with the filter value.
    Prefix,
}

/// A set of tag filter values plus the match mode to apply.
#[derive(Debug, Clone)]
pub struct TagFilter {
    values: Vec<String>,
    mode: TagMatch,
}

impl TagFilter {
    /// Builds a filter from raw CLI values; blank entries are dropped and the
    /// rest lowercased.
    #[must_use]
    pub fn new(values: &[String], mode: TagMatch) -> Self {
        Self {
            values: values
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
            mode,
        }
    }

    /// True when no usable filter values remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when any filter value matches any of the book's tags.
    #[must_use]
    pub fn matches(&self, tags: &[String]) -> bool {
        self.values.iter().any(|value| {
            tags.iter().any(|tag| {
                let tag = tag.to_lowercase();
                match self.mode {
                    TagMatch::Exact => tag == *value,
                    TagMatch::Substring => tag.contains(value),
                    TagMatch::Prefix => tag.starts_with(value),
                }
            })
        })
    }
}

/// Record source backed by a local (or recovered) Calibre database.
#[derive(Debug)]
pub struct CalibreSource {
    pool: SqlitePool,
    filter: Option<TagFilter>,
}

impl CalibreSource {
    /// Opens the database under `library_root`, recovering a copy from the
    /// Drive index when the local file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::DatabaseMissing`] when the file does not exist
    /// and cannot be recovered, or [`SourceError::Db`] when opening fails.
    #[instrument(skip(index, filter), fields(library = %library_root.display()))]
    pub async fn open(
        library_root: &Path,
        filter: Option<TagFilter>,
        index: Option<&dyn FileIndex>,
    ) -> Result<Self, SourceError> {
        let db_path = library_root.join(METADATA_DB);
        let db_path = if db_path.exists() {
            db_path
        } else {
            let Some(index) = index else {
                return Err(SourceError::DatabaseMissing {
                    path: db_path.display().to_string(),
                });
            };
            info!(
                path = %db_path.display(),
                "local Calibre database not found, searching Google Drive"
            );
            recover_database(index, &db_path).await?
        };

        // mode=ro: Calibre may have the library open; never write to its db.
        let db_url = format!("sqlite:{}?mode=ro", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await?;
        Ok(Self { pool, filter })
    }

    /// Wraps an existing pool. Intended for tests that build the schema
    /// themselves.
    #[must_use]
    pub fn from_pool(pool: SqlitePool, filter: Option<TagFilter>) -> Self {
        Self { pool, filter }
    }

    async fn list_books(&self) -> Result<Vec<Record>, SourceError> {
        let rows: Vec<BookRow> = sqlx::query_as(
            r"
            SELECT
                books.id, books.title, books.path, books.pubdate, books.isbn,
                books.series_index,
                s.name AS series,
                p.name AS publisher
            FROM books
            LEFT JOIN books_series_link bsl ON books.id = bsl.book
            LEFT JOIN series s ON bsl.series = s.id
            LEFT JOIN books_publishers_link bpl ON books.id = bpl.book
            LEFT JOIN publishers p ON bpl.publisher = p.id
            ORDER BY books.timestamp DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "fetched book rows");

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(filter) = &self.filter {
                if !filter.is_empty() {
                    let tags = self.book_tags(row.id).await?;
                    if !filter.matches(&tags) {
                        continue;
                    }
                }
            }

            let creators: Vec<String> = sqlx::query_as::<_, (String,)>(
                r"
                SELECT a.name FROM authors a
                JOIN books_authors_link l ON a.id = l.author
                WHERE l.book = ?
                ORDER BY l.id
                ",
            )
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(name,)| name)
            .collect();

            let formats: Vec<FormatEntry> =
                sqlx::query_as::<_, (String, String)>("SELECT format, name FROM data WHERE book = ?")
                    .bind(row.id)
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|(format, name)| FormatEntry { format, name })
                    .collect();

            records.push(Record {
                id: row.id.to_string(),
                title: row.title,
                creators,
                date: non_empty(row.pubdate),
                details: RecordDetails::Book(BookFields {
                    publisher: non_empty(row.publisher),
                    place: None,
                    series: non_empty(row.series),
                    series_index: row.series_index,
                    isbn: non_empty(row.isbn),
                    doi: None,
                }),
                storage: StorageRef::LocalFolder {
                    folder: row.path,
                    formats,
                },
            });
        }
        Ok(records)
    }

    async fn book_tags(&self, book_id: i64) -> Result<Vec<String>, SourceError> {
        let tags = sqlx::query_as::<_, (String,)>(
            r"
            SELECT t.name FROM tags t
            JOIN books_tags_link btl ON t.id = btl.tag
            WHERE btl.book = ?
            ",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(name,)| name)
        .collect();
        Ok(tags)
    }
}

#[async_trait]
impl RecordSource for CalibreSource {
    async fn fetch_records(&self) -> Result<Vec<Record>, SourceError> {
        self.list_books().await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    path: String,
    pubdate: Option<String>,
    isbn: Option<String>,
    series_index: Option<f64>,
    series: Option<String>,
    publisher: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pulls `metadata.db` out of the Drive folder the library syncs to and
/// stages it next to the system temp dir.
async fn recover_database(
    index: &dyn FileIndex,
    missing_path: &Path,
) -> Result<PathBuf, SourceError> {
    let found = crate::drive::find_file_in_folder(index, METADATA_DB, DEFAULT_LIBRARY_ANCHOR)
        .await
        .map_err(|error| {
            warn!(error = %error, "Drive lookup for metadata.db failed");
            SourceError::DatabaseMissing {
                path: missing_path.display().to_string(),
            }
        })?;
    let Some(file) = found else {
        return Err(SourceError::DatabaseMissing {
            path: missing_path.display().to_string(),
        });
    };

    let bytes = index.fetch_content(&file.id).await.map_err(|error| {
        warn!(error = %error, file_id = %file.id, "downloading metadata.db from Drive failed");
        SourceError::DatabaseMissing {
            path: missing_path.display().to_string(),
        }
    })?;

    let staged = std::env::temp_dir().join("shelflist-metadata.db");
    tokio::fs::write(&staged, &bytes).await?;
    info!(
        path = %staged.display(),
        bytes = bytes.len(),
        "recovered Calibre database from Google Drive"
    );
    Ok(staged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filter(values: &[&str], mode: TagMatch) -> TagFilter {
        let values: Vec<String> = values.iter().map(|v| (*v).to_string()).collect();
        TagFilter::new(&values, mode)
    }

    #[test]
    fn test_tag_filter_exact_is_case_insensitive() {
        let f = filter(&["Math"], TagMatch::Exact);
        assert!(f.matches(&["math".to_string()]));
        assert!(!f.matches(&["mathematics".to_string()]));
    }

    #[test]
    fn test_tag_filter_substring() {
        let f = filter(&["math"], TagMatch::Substring);
        assert!(f.matches(&["Applied Mathematics".to_string()]));
        assert!(!f.matches(&["physics".to_string()]));
    }

    #[test]
    fn test_tag_filter_prefix() {
        let f = filter(&["math"], TagMatch::Prefix);
        assert!(f.matches(&["Mathematics".to_string()]));
        assert!(!f.matches(&["applied math".to_string()]));
    }

    #[test]
    fn test_tag_filter_drops_blank_values() {
        let f = filter(&["  ", ""], TagMatch::Exact);
        assert!(f.is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_database_without_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = CalibreSource::open(dir.path(), None, None).await;
        assert!(matches!(
            result,
            Err(SourceError::DatabaseMissing { .. })
        ));
    }
}
