use std::collections::HashMap;

use nsync_types::{
    AttachmentSync, ExternalFileRef, ExternalRecord, Message, PropertyChanges, UpdateOperation,
};
use tracing::{debug, info};

/// Attachments the record should carry: one file reference per attachment with a usable URL.
///
/// Attachments without a URL cannot be stored and are left out.
pub fn desired_attachments(message: &Message) -> Vec<ExternalFileRef> {
    message
        .attachments
        .iter()
        .filter_map(|a| a.usable_url().map(ExternalFileRef::new))
        .collect()
}

fn same_files(a: &[ExternalFileRef], b: &[ExternalFileRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.stable_url() == y.stable_url())
}

/// Matches messages to stored records by ID and computes field-level updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    attachment_sync: AttachmentSync,
}

impl Reconciler {
    pub fn new(attachment_sync: AttachmentSync) -> Self {
        Self { attachment_sync }
    }

    /// Changes needed to bring `record` in line with `message`.
    pub fn diff(&self, message: &Message, record: &ExternalRecord) -> PropertyChanges {
        let mut changes = PropertyChanges::default();

        let desired_status = message.desired_status();
        if desired_status != record.current_status() {
            changes.status = Some(desired_status.to_string());
        }

        let desired = desired_attachments(message);
        let write_attachments = match self.attachment_sync {
            AttachmentSync::Always => true,
            AttachmentSync::WhenChanged => !same_files(&desired, &record.attachments),
        };
        if write_attachments {
            changes.attachments = Some(desired);
        }

        changes
    }

    /// One update per message with a matching record and a non-empty diff, in message order.
    ///
    /// Messages without a record are skipped. If several records share an ID the
    /// first one wins.
    pub fn reconcile(
        &self,
        messages: &[Message],
        records: &[ExternalRecord],
    ) -> Vec<UpdateOperation> {
        let mut by_id: HashMap<&str, &ExternalRecord> = HashMap::with_capacity(records.len());
        for record in records {
            by_id.entry(record.id.as_str()).or_insert(record);
        }

        let mut unmatched = 0usize;
        let mut unchanged = 0usize;
        let mut operations = Vec::new();

        for message in messages {
            let Some(record) = by_id.get(message.id.as_str()) else {
                debug!(message_id = %message.id, "No stored record for message, skipping");
                unmatched += 1;
                continue;
            };

            let changes = self.diff(message, record);
            if changes.is_empty() {
                debug!(message_id = %message.id, "Record already in sync");
                unchanged += 1;
                continue;
            }

            debug!(
                target_id = %record.id,
                status = changes.status.is_some(),
                attachments = changes.attachments.as_ref().map(Vec::len),
                "Record needs update"
            );
            operations.push(UpdateOperation {
                target_id: record.id.clone(),
                property_changes: changes,
            });
        }

        info!(
            messages = messages.len(),
            records = records.len(),
            updates = operations.len(),
            unmatched,
            unchanged,
            "Reconciliation complete"
        );
        operations
    }
}
