use std::collections::HashMap;
use std::sync::Arc;

use nsync_types::UpdateOperation;
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::store::RecordWriter;

/// Result of applying a list of operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    /// Target IDs written successfully, one entry per operation.
    pub applied: Vec<String>,
    /// `(target_id, error)` for each failed operation.
    pub failed: Vec<(String, String)>,
}

impl ApplySummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies update operations with bounded concurrency.
///
/// Distinct targets are written concurrently up to `max_concurrent`. Operations
/// for the same target run one at a time, in the order given, and a target is
/// never written by two `apply_all` calls at once.
pub struct UpdateApplier {
    max_concurrent: usize,
    target_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UpdateApplier {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            target_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Apply every operation. Failures are collected, not retried, and do not
    /// stop writes to other targets.
    pub async fn apply_all(
        &self,
        operations: Vec<UpdateOperation>,
        writer: Arc<dyn RecordWriter>,
    ) -> ApplySummary {
        let total = operations.len();
        let groups = group_by_target(operations);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (target_id, ops) in groups {
            let lock = self.target_lock(&target_id).await;
            let semaphore = semaphore.clone();
            let writer = writer.clone();

            tasks.spawn(async move {
                let mut results = Vec::with_capacity(ops.len());
                // Permit before target lock, so a lock holder always has a permit.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        for _ in &ops {
                            results.push((target_id.clone(), Err(e.to_string())));
                        }
                        return results;
                    }
                };
                let _guard = lock.lock().await;

                for op in &ops {
                    let result = writer.apply(op).await.map_err(|e| e.to_string());
                    match &result {
                        Ok(()) => debug!(target_id = %target_id, "Record updated"),
                        Err(e) => warn!(target_id = %target_id, error = %e, "Record update failed"),
                    }
                    results.push((target_id.clone(), result));
                }
                results
            });
        }

        let mut summary = ApplySummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(results) => {
                    for (target_id, result) in results {
                        match result {
                            Ok(()) => summary.applied.push(target_id),
                            Err(e) => summary.failed.push((target_id, e)),
                        }
                    }
                }
                Err(e) => error!(error = %e, "Update task panicked"),
            }
        }

        self.release_idle_locks().await;

        info!(
            total,
            applied = summary.applied.len(),
            failed = summary.failed.len(),
            "Updates applied"
        );
        summary
    }

    async fn target_lock(&self, target_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.target_locks.lock().await;
        locks
            .entry(target_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop lock entries that no running `apply_all` call still holds.
    async fn release_idle_locks(&self) {
        let mut locks = self.target_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// Group operations by target, keeping first-seen target order and per-target order.
fn group_by_target(operations: Vec<UpdateOperation>) -> Vec<(String, Vec<UpdateOperation>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<UpdateOperation>)> = Vec::new();
    for op in operations {
        match index.get(&op.target_id) {
            Some(&i) => groups[i].1.push(op),
            None => {
                index.insert(op.target_id.clone(), groups.len());
                groups.push((op.target_id.clone(), vec![op]));
            }
        }
    }
    groups
}
