use std::sync::Arc;

use async_trait::async_trait;

use crate::core::state::runtime::reconcile::reconcile_runtime_state::ReconcileRuntimeState;

#[async_trait]
pub trait ReconcileRuntimeStateRepositoryTrait: Send + Sync {
    /// Return the current state as an Arc snapshot.
    async fn get(&self) -> Arc<ReconcileRuntimeState>;

    /// Mutate the state using a closure.
    async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ReconcileRuntimeState) + Send;
}
