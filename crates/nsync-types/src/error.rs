use thiserror::Error;

/// Top-level error type for nsync.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unrecognized input shape: {0}")]
    InputShape(String),

    #[error("Failed to fetch records from source {source_id}: {reason}")]
    StoreFetch { source_id: String, reason: String },

    #[error("Failed to update record {target_id}: {reason}")]
    StoreWrite { target_id: String, reason: String },

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, SyncError>;
