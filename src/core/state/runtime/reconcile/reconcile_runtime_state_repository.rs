use std::sync::Arc;

use tokio::sync::RwLock;

use crate::core::state::runtime::reconcile::reconcile_runtime_state::ReconcileRuntimeState;
use crate::core::state::runtime::reconcile::reconcile_runtime_state_repository_trait::ReconcileRuntimeStateRepositoryTrait;

#[derive(Default)]
pub struct ReconcileRuntimeStateRepository {
    state: RwLock<Arc<ReconcileRuntimeState>>,
}

impl ReconcileRuntimeStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl ReconcileRuntimeStateRepositoryTrait for ReconcileRuntimeStateRepository {
    /// Readers get the current Arc; writers swap in a new one.
    async fn get(&self) -> Arc<ReconcileRuntimeState> {
        self.state.read().await.clone()
    }

    async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ReconcileRuntimeState) + Send,
    {
        let mut guard = self.state.write().await;
        let mut next = (**guard).clone();
        f(&mut next);
        *guard = Arc::new(next);
    }
}
