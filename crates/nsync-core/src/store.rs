use std::future::Future;
use std::pin::Pin;

use nsync_types::{ExternalRecord, Result, UpdateOperation};

/// Source of previously-synchronized records.
pub trait RecordSource: Send + Sync {
    /// Return every record that belongs to `source_id`, already decoded.
    fn fetch_records(
        &self,
        source_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ExternalRecord>>> + Send + '_>>;
}

/// Applies update operations to the store.
///
/// Writes are full-field replacements, so applying the same operation twice
/// must leave the record unchanged.
pub trait RecordWriter: Send + Sync {
    fn apply(
        &self,
        operation: &UpdateOperation,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Records held in memory, e.g. loaded from a file for a dry run.
#[derive(Debug, Clone, Default)]
pub struct StaticRecords {
    records: Vec<ExternalRecord>,
}

impl StaticRecords {
    pub fn new(records: Vec<ExternalRecord>) -> Self {
        Self { records }
    }
}

impl RecordSource for StaticRecords {
    fn fetch_records(
        &self,
        _source_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ExternalRecord>>> + Send + '_>> {
        Box::pin(async move { Ok(self.records.clone()) })
    }
}
