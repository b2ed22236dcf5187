//! Google Drive v3 REST implementation of [`FileIndex`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{CredentialProvider, DriveError, DriveFile, FileIndex, FilePage, IndexQuery};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 60;

/// Fields requested from listing calls.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, webViewLink)";

/// Account summary returned by the startup access probe.
#[derive(Debug, Clone, Default)]
pub struct DriveAbout {
    /// The authenticated user's email, when the API reports one.
    pub email: Option<String>,
    /// Storage used, in bytes.
    pub usage: Option<u64>,
    /// Storage limit, in bytes; unlimited plans omit it.
    pub limit: Option<u64>,
}

/// Drive REST client. Cheap to clone via the shared credential provider.
pub struct GoogleDriveIndex {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleDriveIndex {
    /// Builds an index client over the given credentials.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::Http`] when the HTTP client cannot be built.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, DriveError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
        })
    }

    /// Points the client at a different API root. Intended for tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn bearer(&self) -> Result<String, DriveError> {
        Ok(self.credentials.bearer_token().await?)
    }

    /// Probes API access, returning account and quota information.
    ///
    /// Run once at startup: a failure here means link enrichment should be
    /// disabled for the run.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError`] on network, API, or auth failure.
    #[instrument(skip(self))]
    pub async fn about(&self) -> Result<DriveAbout, DriveError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/about", self.base_url))
            .bearer_auth(token)
            .query(&[("fields", "user,storageQuota")])
            .send()
            .await?;
        let payload: AboutPayload = check(response).await?.json().await?;
        Ok(DriveAbout {
            email: payload.user.and_then(|u| u.email_address),
            usage: payload
                .storage_quota
                .as_ref()
                .and_then(|q| q.usage.as_deref())
                .and_then(|v| v.parse().ok()),
            limit: payload
                .storage_quota
                .as_ref()
                .and_then(|q| q.limit.as_deref())
                .and_then(|v| v.parse().ok()),
        })
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.chars().take(200).collect();
    Err(DriveError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl FileIndex for GoogleDriveIndex {
    async fn list(&self, query: &IndexQuery) -> Result<FilePage, DriveError> {
        let token = self.bearer().await?;
        let mut params = vec![
            ("q", query.q.clone()),
            ("spaces", "drive".to_string()),
            ("fields", LIST_FIELDS.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];
        if let Some(page_token) = &query.page_token {
            params.push(("pageToken", page_token.clone()));
        }
        let response = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;
        let payload: FileListPayload = check(response).await?.json().await?;
        debug!(q = %query.q, files = payload.files.len(), "Drive listing page");
        Ok(FilePage {
            files: payload
                .files
                .into_iter()
                .map(|f| DriveFile {
                    id: f.id,
                    name: f.name,
                    web_view_link: f.web_view_link,
                })
                .collect(),
            next_page_token: payload.next_page_token,
        })
    }

    async fn fetch_content(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/files/{file_id}", self.base_url))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let bytes = check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FileListPayload {
    next_page_token: Option<String>,
    files: Vec<FileEntryPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntryPayload {
    id: String,
    name: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AboutPayload {
    user: Option<AboutUserPayload>,
    storage_quota: Option<StorageQuotaPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AboutUserPayload {
    email_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StorageQuotaPayload {
    usage: Option<String>,
    limit: Option<String>,
}
