use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::state::runtime::reconcile::reconcile_runtime_state::{
    PassCounts, ReconcileRuntimeState, ResourceReconcileState,
};
use crate::core::state::runtime::reconcile::reconcile_runtime_state_repository_trait::ReconcileRuntimeStateRepositoryTrait;

pub struct ReconcileRuntimeStateManager<R: ReconcileRuntimeStateRepositoryTrait> {
    pub(crate) repo: Arc<R>,
}

impl<R: ReconcileRuntimeStateRepositoryTrait> ReconcileRuntimeStateManager<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn snapshot(&self) -> Arc<ReconcileRuntimeState> {
        self.repo.get().await
    }

    pub async fn resource(&self, key: &str) -> Option<ResourceReconcileState> {
        self.repo.get().await.get(key).cloned()
    }

    pub async fn begin_pass(&self, key: &str, pass_id: Uuid, namespace: &str, generation: Option<i64>) {
        let now = Utc::now();
        self.repo
            .update(|state| state.start_pass(key, pass_id, namespace, generation, now))
            .await;
    }

    pub async fn complete_pass(&self, key: &str, counts: PassCounts, interval: Duration) {
        let now = Utc::now();
        self.repo
            .update(|state| state.finish_pass(key, counts, interval, now))
            .await;
    }

    pub async fn skip_pass(&self, key: &str, reason: String) {
        let now = Utc::now();
        self.repo.update(|state| state.skip_pass(key, reason, now)).await;
    }

    pub async fn forget(&self, key: &str) {
        self.repo.update(|state| state.forget(key)).await;
    }

    /// Time left before `key` is due again, or `None` when a pass should run
    /// now: never ran, generation changed, or the due time has passed.
    pub async fn remaining_until_due(
        &self,
        key: &str,
        generation: Option<i64>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let state = self.repo.get().await;
        let entry = state.get(key)?;
        if entry.observed_generation != generation {
            return None;
        }
        let due = entry.next_due_at?;
        (due - now).to_std().ok().filter(|d| !d.is_zero())
    }
}
