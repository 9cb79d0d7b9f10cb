//! Reconciliation state controller

use axum::extract::{Path, State};
use axum::Json;

use crate::api::dto::inspect_dto::StateKeyPath;
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::state::runtime::reconcile::reconcile_runtime_state::{
    ReconcileRuntimeState, ResourceReconcileState,
};
use crate::errors::AppError;

pub struct StateController;

impl StateController {
    pub async fn get_all(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<ReconcileRuntimeState>>, AppError> {
        let snapshot = state.reconcile_state.snapshot().await;
        to_json(Ok((*snapshot).clone()))
    }

    pub async fn get_resource(
        State(state): State<AppState>,
        Path(path): Path<StateKeyPath>,
    ) -> Result<Json<ApiResponse<ResourceReconcileState>>, AppError> {
        let key = path.key();
        match state.reconcile_state.resource(&key).await {
            Some(entry) => to_json(Ok(entry)),
            None => Err(AppError::NotFound(format!("no reconciliation state for {key}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use uuid::Uuid;

    use crate::app_state::build_app_state;
    use crate::core::client::proxy_admin_client::MockProxyAdminClient;
    use crate::core::state::runtime::reconcile::reconcile_runtime_state::{PassCounts, ReconcilePhase};
    use crate::core::state::runtime::reconcile::reconcile_runtime_state_repository::ReconcileRuntimeStateRepository;
    use crate::core::state::runtime::reconcile::ReconcileStateManager;
    use crate::scheduler::retry::RetryPolicy;

    fn path(namespace: &str, name: &str) -> Path<StateKeyPath> {
        Path(StateKeyPath {
            namespace: namespace.into(),
            name: name.into(),
        })
    }

    #[tokio::test]
    async fn reports_recorded_passes() {
        let manager = Arc::new(ReconcileStateManager::new(ReconcileRuntimeStateRepository::new().shared()));
        manager.begin_pass("ops/maid", Uuid::new_v4(), "default", Some(1)).await;
        manager
            .complete_pass("ops/maid", PassCounts { pods: 2, succeeded: 2, ..Default::default() }, Duration::from_secs(10))
            .await;
        let state = build_app_state(Arc::new(MockProxyAdminClient::new()), manager, RetryPolicy::new(1, Duration::ZERO));

        let Json(all) = StateController::get_all(State(state.clone())).await.unwrap();
        assert!(all.is_successful);
        assert_eq!(all.data.unwrap().resources.len(), 1);

        let Json(one) = StateController::get_resource(State(state.clone()), path("ops", "maid"))
            .await
            .unwrap();
        let entry = one.data.unwrap();
        assert_eq!(entry.phase, ReconcilePhase::Idle);
        assert_eq!(entry.last_counts.pods, 2);

        assert!(StateController::get_resource(State(state), path("ops", "other")).await.is_err());
    }
}
