use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// What to do with empty or whitespace-only tags (e.g. from a trailing comma).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTagPolicy {
    /// Drop them before filtering.
    #[default]
    Strip,
    /// Keep them; an empty needle matches every message.
    MatchAll,
}

/// When the attachments field is written to a matched record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSync {
    /// Only when the desired list differs from the record's current list.
    /// URLs are compared without their query string, so re-signed CDN links
    /// to the same files do not trigger a write.
    #[default]
    WhenChanged,
    /// On every matched record, even if nothing changed.
    Always,
}

impl std::fmt::Display for EmptyTagPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Strip => "strip",
            Self::MatchAll => "match_all",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EmptyTagPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strip" => Ok(Self::Strip),
            "match_all" | "match-all" => Ok(Self::MatchAll),
            other => Err(SyncError::Config(format!(
                "Unknown empty tag policy: {other} (expected strip or match_all)"
            ))),
        }
    }
}

impl std::fmt::Display for AttachmentSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WhenChanged => "when_changed",
            Self::Always => "always",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AttachmentSync {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "when_changed" | "when-changed" => Ok(Self::WhenChanged),
            "always" => Ok(Self::Always),
            other => Err(SyncError::Config(format!(
                "Unknown attachment sync mode: {other} (expected when_changed or always)"
            ))),
        }
    }
}
