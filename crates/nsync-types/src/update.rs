use serde::{Deserialize, Serialize};

use crate::record::ExternalFileRef;

/// Field-level changes for one record. Absent fields are left untouched by the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ExternalFileRef>>,
}

impl PropertyChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.attachments.is_none()
    }
}

/// A full-field replacement to apply to the record identified by `target_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOperation {
    pub target_id: String,
    pub property_changes: PropertyChanges,
}
