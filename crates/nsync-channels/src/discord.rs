//! Discord channel feed using the REST API.
//!
//! Pulls a channel's recent messages and hands them over as a raw batch whose
//! single item carries the message array.

use std::time::Duration;

use nsync_config::Config;
use nsync_core::RawBatch;
use nsync_types::{Result, SyncError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Discord message feed.
pub struct DiscordFeed {
    client: reqwest::Client,
    api_url: String,
}

impl DiscordFeed {
    /// Create a feed authenticated with the given bot token.
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bot {bot_token}"))
            .map_err(|e| SyncError::Config(format!("Invalid DISCORD_BOT_TOKEN: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Channel(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (token, _) = config.require_feed()?;
        Self::new(&config.discord_api_url, token)
    }

    /// Fetch up to `limit` (1..=100) recent messages of a channel, newest first.
    pub async fn fetch_batch(&self, channel_id: &str, limit: u32) -> Result<RawBatch> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_url);
        let limit = limit.clamp(1, 100);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| SyncError::Channel(format!("Discord request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Channel(format!(
                "Discord returned {status} for channel {channel_id}: {body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SyncError::Channel(format!("Invalid Discord response: {e}")))?;
        let count = match &payload {
            Value::Array(messages) => messages.len(),
            _ => {
                return Err(SyncError::Channel(format!(
                    "Expected a message array for channel {channel_id}"
                )))
            }
        };

        debug!(channel_id, limit, "Discord messages fetched");
        info!(channel_id, count, "Feed batch received");
        Ok(RawBatch::from_payload(payload))
    }
}
