use std::path::PathBuf;

use nsync_types::{AttachmentSync, EmptyTagPolicy, Result, SyncError};

const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com";
const DEFAULT_NOTION_VERSION: &str = "2025-09-03";
const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Notion (record store)
    pub notion_api_key: Option<String>,
    pub notion_api_url: String,
    pub notion_version: String,
    pub notion_data_source_id: Option<String>,
    pub notion_status_property: String,
    pub notion_attachments_property: String,
    pub notion_page_size: u32,

    // Filtering / reconciliation
    pub filter_tags: String,
    pub empty_tag_policy: EmptyTagPolicy,
    pub attachment_sync: AttachmentSync,

    // Discord (message feed)
    pub discord_bot_token: Option<String>,
    pub discord_api_url: String,
    pub discord_channel_id: Option<String>,
    pub discord_fetch_limit: u32,

    // Applying updates
    pub apply_max_concurrent: usize,

    // Logging
    pub log_level: String,
    pub log_json: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notion_api_key: None,
            notion_api_url: DEFAULT_NOTION_API_URL.to_string(),
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
            notion_data_source_id: None,
            notion_status_property: "Status".to_string(),
            notion_attachments_property: "attachments".to_string(),
            notion_page_size: 100,
            filter_tags: String::new(),
            empty_tag_policy: EmptyTagPolicy::default(),
            attachment_sync: AttachmentSync::default(),
            discord_bot_token: None,
            discord_api_url: DEFAULT_DISCORD_API_URL.to_string(),
            discord_channel_id: None,
            discord_fetch_limit: 50,
            apply_max_concurrent: 4,
            log_level: "info".to_string(),
            log_json: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (with dotenvy).
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors, the file is optional)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        let empty_tag_policy = match env_opt("EMPTY_TAG_POLICY") {
            Some(v) => v.parse()?,
            None => defaults.empty_tag_policy,
        };
        let attachment_sync = match env_opt("ATTACHMENT_SYNC") {
            Some(v) => v.parse()?,
            None => defaults.attachment_sync,
        };

        let config = Config {
            notion_api_key: env_opt("NOTION_API_KEY"),
            notion_api_url: env_or("NOTION_API_URL", || defaults.notion_api_url.clone()),
            notion_version: env_or("NOTION_VERSION", || defaults.notion_version.clone()),
            notion_data_source_id: env_opt("NOTION_DATA_SOURCE_ID"),
            notion_status_property: env_or("NOTION_STATUS_PROPERTY", || {
                defaults.notion_status_property.clone()
            }),
            notion_attachments_property: env_or("NOTION_ATTACHMENTS_PROPERTY", || {
                defaults.notion_attachments_property.clone()
            }),
            notion_page_size: env_u32("NOTION_PAGE_SIZE", defaults.notion_page_size).clamp(1, 100),

            filter_tags: env_or("FILTER_TAGS", String::new),
            empty_tag_policy,
            attachment_sync,

            discord_bot_token: env_opt("DISCORD_BOT_TOKEN"),
            discord_api_url: env_or("DISCORD_API_URL", || defaults.discord_api_url.clone()),
            discord_channel_id: env_opt("DISCORD_CHANNEL_ID"),
            discord_fetch_limit: env_u32("DISCORD_FETCH_LIMIT", defaults.discord_fetch_limit)
                .clamp(1, 100),

            apply_max_concurrent: env_usize("APPLY_MAX_CONCURRENT", defaults.apply_max_concurrent)
                .max(1),

            log_level: env_or("LOG_LEVEL", || defaults.log_level.clone()),
            log_json: env_bool("LOG_JSON", defaults.log_json),
            log_file: env_opt("LOG_FILE").map(PathBuf::from),
        };

        Ok(config)
    }

    /// Notion API key and data source ID, required for any store access.
    pub fn require_store(&self) -> Result<(&str, &str)> {
        let key = required(&self.notion_api_key, "NOTION_API_KEY")?;
        let source = required(&self.notion_data_source_id, "NOTION_DATA_SOURCE_ID")?;
        Ok((key, source))
    }

    /// Discord bot token and channel ID, required to pull messages from the feed.
    pub fn require_feed(&self) -> Result<(&str, &str)> {
        let token = required(&self.discord_bot_token, "DISCORD_BOT_TOKEN")?;
        let channel = required(&self.discord_channel_id, "DISCORD_CHANNEL_ID")?;
        Ok((token, channel))
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| SyncError::Config(format!("{key} is not set")))
}

// ---------------------------------------------------------------------------
// Env helpers
// ---------------------------------------------------------------------------

fn env_or(key: &str, default: impl FnOnce() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| default())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; tests that call `Config::load` take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.notion_api_url, "https://api.notion.com");
        assert_eq!(cfg.notion_version, "2025-09-03");
        assert_eq!(cfg.notion_status_property, "Status");
        assert_eq!(cfg.notion_attachments_property, "attachments");
        assert_eq!(cfg.empty_tag_policy, EmptyTagPolicy::Strip);
        assert_eq!(cfg.attachment_sync, AttachmentSync::WhenChanged);
        assert_eq!(cfg.apply_max_concurrent, 4);
    }

    #[test]
    fn config_env_override() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("DISCORD_FETCH_LIMIT", "25");
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.discord_fetch_limit, 25);
        std::env::remove_var("DISCORD_FETCH_LIMIT");
    }

    #[test]
    fn config_page_size_is_clamped() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("NOTION_PAGE_SIZE", "500");
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.notion_page_size, 100);
        std::env::remove_var("NOTION_PAGE_SIZE");
    }

    #[test]
    fn config_policy_from_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("EMPTY_TAG_POLICY", "match_all");
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.empty_tag_policy, EmptyTagPolicy::MatchAll);
        std::env::remove_var("EMPTY_TAG_POLICY");
    }

    #[test]
    fn config_rejects_unknown_attachment_sync() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("ATTACHMENT_SYNC", "sometimes");
        let result = Config::load();
        std::env::remove_var("ATTACHMENT_SYNC");
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn require_store_names_missing_key() {
        let cfg = Config {
            notion_api_key: Some("secret_abc".to_string()),
            ..Default::default()
        };
        let err = cfg.require_store().unwrap_err();
        assert!(err.to_string().contains("NOTION_DATA_SOURCE_ID"));
    }

    #[test]
    fn require_store_ok() {
        let cfg = Config {
            notion_api_key: Some("secret_abc".to_string()),
            notion_data_source_id: Some("ds-1".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.require_store().unwrap(), ("secret_abc", "ds-1"));
    }

    #[test]
    fn require_feed_names_missing_key() {
        let cfg = Config::default();
        let err = cfg.require_feed().unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));
    }
}
