//! Notion data-source client: paginated record query and page updates.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use nsync_config::Config;
use nsync_core::{RecordSource, RecordWriter};
use nsync_types::{ExternalRecord, Result, SyncError, UpdateOperation};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::mapping::{native_properties, page_to_record, NotionPage, PropertyNames};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`NotionStore`].
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub api_url: String,
    pub api_key: String,
    pub version: String,
    pub page_size: u32,
    pub properties: PropertyNames,
}

impl NotionSettings {
    /// Settings from the application config. Fails if no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .notion_api_key
            .clone()
            .ok_or_else(|| SyncError::Config("NOTION_API_KEY is not set".to_string()))?;
        Ok(Self {
            api_url: config.notion_api_url.clone(),
            api_key,
            version: config.notion_version.clone(),
            page_size: config.notion_page_size,
            properties: PropertyNames {
                status: config.notion_status_property.clone(),
                attachments: config.notion_attachments_property.clone(),
            },
        })
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<NotionPage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct NotionErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Notion-backed record store.
pub struct NotionStore {
    client: reqwest::Client,
    api_url: String,
    page_size: u32,
    properties: PropertyNames,
}

impl NotionStore {
    pub fn new(settings: NotionSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|e| SyncError::Config(format!("Invalid NOTION_API_KEY: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            "notion-version",
            HeaderValue::from_str(&settings.version)
                .map_err(|e| SyncError::Config(format!("Invalid NOTION_VERSION: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size.clamp(1, 100),
            properties: settings.properties,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(NotionSettings::from_config(config)?)
    }

    /// Query every page of a data source, following cursors until exhausted.
    pub async fn query_all(&self, source_id: &str) -> Result<Vec<ExternalRecord>> {
        let url = format!("{}/v1/data_sources/{source_id}/query", self.api_url);
        let fetch_err = |reason: String| SyncError::StoreFetch {
            source_id: source_id.to_string(),
            reason,
        };

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let body = QueryRequest {
                page_size: self.page_size,
                start_cursor: cursor.as_deref(),
            };
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| fetch_err(e.to_string()))?;
            let response = check_status(response).await.map_err(fetch_err)?;
            let page: QueryResponse = response
                .json()
                .await
                .map_err(|e| fetch_err(format!("Invalid query response: {e}")))?;

            pages += 1;
            debug!(
                source_id,
                page = pages,
                results = page.results.len(),
                has_more = page.has_more,
                "Query page received"
            );
            records.extend(
                page.results
                    .iter()
                    .map(|p| page_to_record(p, &self.properties)),
            );

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                (true, None) => {
                    warn!(source_id, "Query reported more results without a cursor, stopping");
                    break;
                }
                (false, _) => break,
            }
        }

        info!(source_id, records = records.len(), pages, "Data source query complete");
        Ok(records)
    }

    /// Replace the changed properties of one page.
    pub async fn update_page(&self, operation: &UpdateOperation) -> Result<()> {
        let url = format!("{}/v1/pages/{}", self.api_url, operation.target_id);
        let write_err = |reason: String| SyncError::StoreWrite {
            target_id: operation.target_id.clone(),
            reason,
        };

        let body = json!({
            "properties": native_properties(&operation.property_changes, &self.properties)
        });
        let response = self
            .client
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| write_err(e.to_string()))?;
        check_status(response).await.map_err(write_err)?;

        debug!(target_id = %operation.target_id, "Page updated");
        Ok(())
    }
}

/// Pass through 2xx responses; turn anything else into a readable reason.
async fn check_status(response: reqwest::Response) -> std::result::Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<NotionErrorBody>(&text) {
        Ok(NotionErrorBody {
            code: Some(code),
            message: Some(message),
        }) => format!("{code}: {message}"),
        _ if text.is_empty() => String::new(),
        _ => text,
    };

    if detail.is_empty() {
        Err(status.to_string())
    } else {
        Err(format!("{status} {detail}"))
    }
}

impl RecordSource for NotionStore {
    fn fetch_records(
        &self,
        source_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ExternalRecord>>> + Send + '_>> {
        let source_id = source_id.to_string();
        Box::pin(async move { self.query_all(&source_id).await })
    }
}

impl RecordWriter for NotionStore {
    fn apply(
        &self,
        operation: &UpdateOperation,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let operation = operation.clone();
        Box::pin(async move { self.update_page(&operation).await })
    }
}
