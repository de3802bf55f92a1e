use chrono::{DateTime, Utc};
use nsync_config::Config;
use nsync_types::{AttachmentSync, Message, Result, UpdateOperation};
use serde::Serialize;
use tracing::{info, warn};

use crate::normalizer::{normalize, RawBatch};
use crate::reconciler::Reconciler;
use crate::store::RecordSource;
use crate::tag_filter::{filter_messages, FilterOutcome, TagSet};

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    /// No message matched the tags. The store was not queried.
    NoMatches { processed: usize },
    Reconciled(PassReport),
}

impl PassOutcome {
    /// Operations produced by the pass (empty when nothing matched).
    pub fn operations(&self) -> &[UpdateOperation] {
        match self {
            Self::NoMatches { .. } => &[],
            Self::Reconciled(report) => &report.operations,
        }
    }

    pub fn into_operations(self) -> Vec<UpdateOperation> {
        match self {
            Self::NoMatches { .. } => Vec::new(),
            Self::Reconciled(report) => report.operations,
        }
    }
}

/// What a pass saw and what it decided.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub generated_at: DateTime<Utc>,
    pub processed: usize,
    pub matched_messages: Vec<Message>,
    pub records_seen: usize,
    pub operations: Vec<UpdateOperation>,
}

/// One normalize → filter → reconcile pass.
#[derive(Debug, Clone)]
pub struct SyncPass {
    tags: TagSet,
    reconciler: Reconciler,
}

impl SyncPass {
    pub fn new(tags: TagSet, attachment_sync: AttachmentSync) -> Self {
        Self {
            tags,
            reconciler: Reconciler::new(attachment_sync),
        }
    }

    /// Build a pass from the configured tag string and policies.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TagSet::parse(&config.filter_tags, config.empty_tag_policy),
            config.attachment_sync,
        )
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Run the pass against the records `source` holds for `source_id`.
    ///
    /// Either the full list of operations is returned or an error; a failed
    /// fetch never yields a partial result.
    pub async fn run(
        &self,
        batch: &RawBatch,
        source_id: &str,
        source: &dyn RecordSource,
    ) -> Result<PassOutcome> {
        let messages = normalize(batch)?;
        let processed = messages.len();

        if self.tags.is_empty() {
            warn!("No filter tags configured, no message can match");
        }

        let matched = match filter_messages(messages, &self.tags) {
            FilterOutcome::NoMatches { processed } => {
                info!(processed, "No messages matched the tag filter");
                return Ok(PassOutcome::NoMatches { processed });
            }
            FilterOutcome::Matched(matched) => matched,
        };
        info!(processed, matched = matched.len(), "Messages selected for sync");

        let records = source.fetch_records(source_id).await?;
        info!(source_id, records = records.len(), "Stored records fetched");

        let operations = self.reconciler.reconcile(&matched, &records);

        Ok(PassOutcome::Reconciled(PassReport {
            generated_at: Utc::now(),
            processed,
            matched_messages: matched,
            records_seen: records.len(),
            operations,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use tracing_subscriber::prelude::*;

    use nsync_types::{EmptyTagPolicy, ExternalRecord, SyncError};
    use serde_json::json;

    struct CountingSource {
        calls: AtomicU32,
        fail: bool,
        records: Vec<ExternalRecord>,
    }

    impl CountingSource {
        fn new(records: Vec<ExternalRecord>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: false,
                records,
            }
        }
    }

    impl RecordSource for CountingSource {
        fn fetch_records(
            &self,
            source_id: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ExternalRecord>>> + Send + '_>> {
            let source_id = source_id.to_string();
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(SyncError::StoreFetch {
                        source_id,
                        reason: "503 Service Unavailable".to_string(),
                    });
                }
                Ok(self.records.clone())
            })
        }
    }

    fn batch_of(messages: serde_json::Value) -> RawBatch {
        RawBatch::from_payload(messages)
    }

    fn discord_message(id: &str, content: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": 0,
            "content": content,
            "channel_id": "900",
            "timestamp": "2025-06-01T10:00:00.000000+00:00",
            "author": {"id": "42", "username": "alice"},
            "reactions": [{"count": 1, "emoji": {"name": "resolved"}}]
        })
    }

    fn pass(tags: &str) -> SyncPass {
        SyncPass::new(
            TagSet::parse(tags, EmptyTagPolicy::Strip),
            AttachmentSync::WhenChanged,
        )
    }

    #[tokio::test]
    async fn no_match_skips_store() {
        let source = CountingSource::new(vec![]);
        let outcome = pass("incidencia:")
            .run(&batch_of(json!([discord_message("1", "hola")])), "ds-1", &source)
            .await
            .unwrap();
        assert!(matches!(outcome, PassOutcome::NoMatches { processed: 1 }));
        assert!(outcome.operations().is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matched_messages_are_reconciled() {
        let source = CountingSource::new(vec![ExternalRecord {
            id: "1".to_string(),
            status: Some("open".to_string()),
            attachments: vec![],
        }]);
        let batch = batch_of(json!([
            discord_message("1", "incidencia: disco"),
            discord_message("2", "hola")
        ]));
        let outcome = pass("incidencia:").run(&batch, "ds-1", &source).await.unwrap();

        let PassOutcome::Reconciled(report) = &outcome else {
            panic!("expected a reconciled pass, got {outcome:?}");
        };
        assert_eq!(report.processed, 2);
        assert_eq!(report.matched_messages.len(), 1);
        assert_eq!(report.records_seen, 1);
        assert_eq!(report.operations.len(), 1);
        assert_eq!(
            report.operations[0].property_changes.status.as_deref(),
            Some("resolved")
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal() {
        let mut source = CountingSource::new(vec![]);
        source.fail = true;
        let err = pass("incidencia:")
            .run(
                &batch_of(json!([discord_message("1", "incidencia: x")])),
                "ds-1",
                &source,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::StoreFetch { .. }));
    }

    #[tokio::test]
    async fn shape_error_stops_before_fetch() {
        let source = CountingSource::new(vec![]);
        let batch = batch_of(json!([{"not": "a message"}]));
        let err = pass("x").run(&batch, "ds-1", &source).await.unwrap_err();
        assert!(matches!(err, SyncError::InputShape(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    struct WarnCounter(Arc<AtomicU32>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn empty_tag_set_warns_once_per_pass() {
        let warnings = Arc::new(AtomicU32::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = CountingSource::new(vec![]);
        let outcome = pass(",,")
            .run(&batch_of(json!([discord_message("1", "hola")])), "ds-1", &source)
            .await
            .unwrap();

        assert!(matches!(outcome, PassOutcome::NoMatches { processed: 1 }));
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn from_config_uses_tag_settings() {
        let config = Config {
            filter_tags: "Bug,".to_string(),
            ..Default::default()
        };
        let pass = SyncPass::from_config(&config);
        assert_eq!(pass.tags().needles(), ["bug"]);
    }

    #[test]
    fn outcome_serializes_tagged() {
        let json = serde_json::to_value(PassOutcome::NoMatches { processed: 3 }).unwrap();
        assert_eq!(json, json!({"outcome": "no_matches", "processed": 3}));
    }
}
