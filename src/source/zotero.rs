//! Zotero Web API v3 source: paginated item listing and child lookups.
//!
//! The API returns loosely-shaped item dictionaries; deserialization narrows
//! them into [`ItemData`] and the mapping into [`Record`] assigns the tagged
//! [`RecordDetails`] variant per item type.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{RecordSource, SourceError};
use crate::record::{
    ArticleFields, BookFields, ManuscriptFields, OtherFields, Record, RecordDetails, StorageRef,
    extract_arxiv_id, format_creator,
};

const DEFAULT_BASE_URL: &str = "https://api.zotero.org";
const API_VERSION: &str = "3";
const PAGE_LIMIT: usize = 100;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Whether the library id names a user or a group library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    fn path_segment(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

/// Which items to list: everything, one collection, or one item type.
#[derive(Debug, Clone, Default)]
pub struct ItemScope {
    /// Restrict to a collection key.
    pub collection: Option<String>,
    /// Restrict to an item type (e.g. "book", "journalArticle").
    pub item_type: Option<String>,
}

/// A collection's key/name pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub key: String,
    pub name: String,
}

/// Thin client over the Zotero Web API.
#[derive(Debug)]
pub struct ZoteroClient {
    http: reqwest::Client,
    base_url: String,
    library_prefix: String,
    api_key: String,
}

impl ZoteroClient {
    /// Builds a client for the given library.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] when the HTTP client cannot be built.
    pub fn new(
        library_id: &str,
        library_type: LibraryType,
        api_key: &str,
    ) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            library_prefix: format!("{}/{library_id}", library_type.path_segment()),
            api_key: api_key.to_string(),
        })
    }

    /// Points the client at a different API root. Intended for tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}/{path}", self.base_url, self.library_prefix);
        let response = self
            .http
            .get(&url)
            .header("Zotero-API-Version", API_VERSION)
            .header("Zotero-API-Key", &self.api_key)
            .query(query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(200).collect();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Lists all collections in the library.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on network or API failure.
    #[instrument(skip(self))]
    pub async fn collections(&self) -> Result<Vec<Collection>, SourceError> {
        let mut out = Vec::new();
        let mut start = 0usize;
        loop {
            let page: Vec<CollectionPayload> = self
                .get_json(
                    "collections",
                    &[
                        ("limit", PAGE_LIMIT.to_string()),
                        ("start", start.to_string()),
                    ],
                )
                .await?;
            let page_len = page.len();
            out.extend(page.into_iter().map(|c| Collection {
                key: c.key,
                name: c.data.name,
            }));
            if page_len < PAGE_LIMIT {
                break;
            }
            start += PAGE_LIMIT;
        }
        Ok(out)
    }

    /// Fetches one collection's name by key. Best-effort callers treat
    /// failure as "no name".
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on network or API failure.
    pub async fn collection(&self, key: &str) -> Result<Collection, SourceError> {
        let payload: CollectionPayload = self.get_json(&format!("collections/{key}"), &[]).await?;
        Ok(Collection {
            key: payload.key,
            name: payload.data.name,
        })
    }

    /// Lists all items in scope, following `limit`/`start` pagination until a
    /// short page.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on network or API failure.
    #[instrument(skip(self, scope))]
    pub async fn items(&self, scope: &ItemScope) -> Result<Vec<ApiItem>, SourceError> {
        let path = match &scope.collection {
            Some(key) => format!("collections/{key}/items"),
            None => "items".to_string(),
        };
        let mut out = Vec::new();
        let mut start = 0usize;
        loop {
            let mut query = vec![
                ("limit", PAGE_LIMIT.to_string()),
                ("start", start.to_string()),
            ];
            if let Some(item_type) = &scope.item_type {
                query.push(("itemType", item_type.clone()));
            }
            let page: Vec<ApiItem> = self.get_json(&path, &query).await?;
            let page_len = page.len();
            out.extend(page);
            debug!(fetched = out.len(), "item page retrieved");
            if page_len < PAGE_LIMIT {
                break;
            }
            start += PAGE_LIMIT;
        }
        Ok(out)
    }

    /// Fetches the child objects of an item (attachments and notes).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on network or API failure.
    pub async fn children(&self, item_key: &str) -> Result<Vec<ApiItem>, SourceError> {
        self.get_json(&format!("items/{item_key}/children"), &[])
            .await
    }
}

#[derive(Debug, Deserialize)]
struct CollectionPayload {
    key: String,
    data: CollectionData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CollectionData {
    name: String,
}

/// One item as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiItem {
    pub key: String,
    pub data: ItemData,
}

/// The `data` envelope of an item. Absent fields default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemData {
    pub item_type: String,
    pub title: String,
    pub creators: Vec<Creator>,
    pub date: String,
    pub publisher: String,
    pub place: String,
    #[serde(rename = "ISBN")]
    pub isbn: String,
    #[serde(rename = "DOI")]
    pub doi: String,
    pub publication_title: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    pub url: String,
    pub extra: String,
    /// Attachment children only.
    pub content_type: String,
    /// Attachment children only.
    pub filename: String,
}

/// One creator entry: either split name parts or a single display name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Creator {
    pub first_name: String,
    pub last_name: String,
    pub name: String,
}

/// Item types excluded from record listings.
fn is_listed_type(item_type: &str) -> bool {
    item_type != "note" && item_type != "attachment"
}

fn opt(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Maps an API item into the uniform record model.
#[must_use]
pub fn record_from_item(item: &ApiItem) -> Record {
    let data = &item.data;
    let creators = data
        .creators
        .iter()
        .filter_map(|c| {
            format_creator(
                opt(&c.first_name).as_deref(),
                opt(&c.last_name).as_deref(),
                opt(&c.name).as_deref(),
            )
        })
        .collect();

    let details = match data.item_type.as_str() {
        "book" => RecordDetails::Book(BookFields {
            publisher: opt(&data.publisher),
            place: opt(&data.place),
            series: None,
            series_index: None,
            isbn: opt(&data.isbn),
            doi: opt(&data.doi),
        }),
        "journalArticle" => RecordDetails::Article(ArticleFields {
            journal: opt(&data.publication_title),
            volume: opt(&data.volume),
            issue: opt(&data.issue),
            pages: opt(&data.pages),
            doi: opt(&data.doi),
        }),
        "manuscript" => RecordDetails::Manuscript(ManuscriptFields {
            url: opt(&data.url),
            arxiv_id: extract_arxiv_id(&data.extra),
            doi: opt(&data.doi),
        }),
        other => RecordDetails::Other(OtherFields {
            item_type: other.to_string(),
            doi: opt(&data.doi),
        }),
    };

    Record {
        id: item.key.clone(),
        title: data.title.clone(),
        creators,
        date: opt(&data.date),
        details,
        storage: StorageRef::RemoteItem {
            item_key: item.key.clone(),
        },
    }
}

/// Record source over a [`ZoteroClient`] with a fixed item scope.
#[derive(Debug)]
pub struct ZoteroSource {
    client: std::sync::Arc<ZoteroClient>,
    scope: ItemScope,
}

impl ZoteroSource {
    #[must_use]
    pub fn new(client: std::sync::Arc<ZoteroClient>, scope: ItemScope) -> Self {
        Self { client, scope }
    }
}

#[async_trait]
impl RecordSource for ZoteroSource {
    async fn fetch_records(&self) -> Result<Vec<Record>, SourceError> {
        let items = self.client.items(&self.scope).await?;
        let records: Vec<Record> = items
            .iter()
            .filter(|item| is_listed_type(&item.data.item_type))
            .map(record_from_item)
            .collect();
        debug!(
            total = items.len(),
            listed = records.len(),
            "filtered notes and attachments out of item listing"
        );
        Ok(records)
    }
}
