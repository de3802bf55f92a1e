use serde::{Deserialize, Serialize};

/// Pointer to a file hosted outside the store. Serializes as `{"kind": "external", "url": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "external")]
pub struct ExternalFileRef {
    pub url: String,
}

impl ExternalFileRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The URL without query string or fragment.
    ///
    /// Discord CDN links carry rotating signature parameters (`ex`, `is`, `hm`),
    /// so two links to the same file compare equal only on this part.
    pub fn stable_url(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or(self.url.as_str())
    }

    /// Last path segment of the URL (query string removed), used as a display name.
    pub fn file_name(&self) -> &str {
        self.stable_url()
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(self.url.as_str())
    }
}

/// A previously-synchronized record, already decoded from the store's native encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attachments: Vec<ExternalFileRef>,
}

impl ExternalRecord {
    /// Current status, with a missing value read as `""`.
    pub fn current_status(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }
}
