//! kube-runtime controller driving one pass per `ClusterMaid` object.
//!
//! Each object is its own reconciliation key, so distinct objects reconcile
//! concurrently while the runtime never runs two reconciles of one object at
//! the same time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use futures::StreamExt;
use kube::api::ListParams;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::crd::cluster_maid::{ClusterMaid, ControllingResource};
use crate::core::state::runtime::reconcile::ReconcileStateManager;
use crate::core::util::duration::format_duration;
use crate::errors::InspectError;
use crate::scheduler::tasks::reconcile::task::{execute_pass, PassContext, PassOutcome};

pub struct ControllerContext {
    pub pass: PassContext,
    pub state: Arc<ReconcileStateManager>,
    pub fallback_interval: Duration,
    pub cancel: CancellationToken,
}

pub async fn reconcile(
    object: Arc<ClusterMaid>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, InspectError> {
    let resource = ControllingResource::from_object(&object, ctx.fallback_interval);

    if object.metadata.deletion_timestamp.is_some() {
        debug!(resource = %resource.key, "ClusterMaid is being deleted");
        ctx.state.forget(&resource.key).await;
        return Ok(Action::await_change());
    }

    // watch events between passes must not shorten the cadence
    if let Some(remaining) = ctx
        .state
        .remaining_until_due(&resource.key, resource.generation, Utc::now())
        .await
    {
        debug!(resource = %resource.key, "Pass not due for {}", format_duration(remaining));
        return Ok(Action::requeue(remaining));
    }

    match execute_pass(&ctx.pass, &ctx.state, &resource, &ctx.cancel).await {
        PassOutcome::Completed(_) => Ok(Action::requeue(resource.requeue_interval)),
        PassOutcome::Skipped(e) => Err(e),
    }
}

pub fn error_policy(object: Arc<ClusterMaid>, error: &InspectError, ctx: Arc<ControllerContext>) -> Action {
    error!(
        resource = %object.name_any(),
        namespace = ?object.namespace(),
        error = %error,
        "Reconciliation failed"
    );
    Action::requeue(ctx.fallback_interval)
}

/// Watch `ClusterMaid` objects in every namespace until a termination
/// signal arrives.
pub async fn run_controller(client: Client, ctx: Arc<ControllerContext>) -> Result<()> {
    let api: Api<ClusterMaid> = Api::all(client);

    // fail early when the CRD is not installed
    api.list(&ListParams::default().limit(1))
        .await
        .context("ClusterMaid CRD is not queryable; is it installed?")?;

    info!("Starting ClusterMaid controller");
    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(resource = %object.name, ?action, "Reconciliation completed");
                }
                Err(e) => {
                    warn!(error = %e, "Controller error");
                }
            }
        })
        .await;

    info!("ClusterMaid controller stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::client::proxy_admin_client::MockProxyAdminClient;
    use crate::core::client::pods::MockPodLister;
    use crate::core::crd::cluster_maid::ClusterMaidSpec;
    use crate::core::state::runtime::reconcile::reconcile_runtime_state_repository::ReconcileRuntimeStateRepository;
    use crate::scheduler::tasks::reconcile::task::tests::{
        admin_with_timeout_on_web2, context, lister, CollectingSink,
    };

    fn object(generation: i64) -> Arc<ClusterMaid> {
        let mut object = ClusterMaid::new(
            "maid",
            ClusterMaidSpec {
                requeue_interval: Some("30s".into()),
                ..Default::default()
            },
        );
        object.metadata.namespace = Some("ops".into());
        object.metadata.generation = Some(generation);
        Arc::new(object)
    }

    fn ctx(pods: MockPodLister, admin: MockProxyAdminClient) -> Arc<ControllerContext> {
        Arc::new(ControllerContext {
            pass: context(pods, admin, Arc::new(CollectingSink::default())),
            state: Arc::new(ReconcileStateManager::new(ReconcileRuntimeStateRepository::new().shared())),
            fallback_interval: Duration::from_secs(10),
            cancel: CancellationToken::new(),
        })
    }

    #[tokio::test]
    async fn completed_pass_requeues_after_the_resource_interval() {
        let ctx = ctx(lister(&["web-1", "web-2"]), admin_with_timeout_on_web2());
        let action = reconcile(object(1), ctx.clone()).await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(30)));

        let entry = ctx.state.resource("ops/maid").await.unwrap();
        assert_eq!(entry.observed_generation, Some(1));
        assert_eq!(entry.last_counts.succeeded, 1);
    }

    #[tokio::test]
    async fn unchanged_object_is_not_reinspected_before_due() {
        let mut pods = MockPodLister::new();
        pods.expect_list_pods().times(2).returning(|_| Ok(Vec::new()));
        let ctx = ctx(pods, MockProxyAdminClient::new());

        reconcile(object(1), ctx.clone()).await.unwrap();
        // same generation, not due yet: no listing
        let action = reconcile(object(1), ctx.clone()).await.unwrap();
        assert_ne!(action, Action::await_change());
        // spec change runs right away
        reconcile(object(2), ctx.clone()).await.unwrap();
    }

    #[tokio::test]
    async fn listing_failure_goes_to_error_policy() {
        let mut pods = MockPodLister::new();
        pods.expect_list_pods()
            .returning(|_| Err(InspectError::transport("pods in namespace 'default'", "forbidden")));
        let ctx = ctx(pods, MockProxyAdminClient::new());

        let err = reconcile(object(1), ctx.clone()).await.unwrap_err();
        assert!(matches!(err, InspectError::Transport { .. }));
        assert_eq!(
            error_policy(object(1), &err, ctx.clone()),
            Action::requeue(Duration::from_secs(10))
        );
        let entry = ctx.state.resource("ops/maid").await.unwrap();
        assert!(entry.last_skip_reason.is_some());
    }

    #[tokio::test]
    async fn deleted_object_is_forgotten() {
        let ctx = ctx(lister(&["web-1"]), admin_with_timeout_on_web2());
        reconcile(object(1), ctx.clone()).await.unwrap();
        assert!(ctx.state.resource("ops/maid").await.is_some());

        let mut deleted = (*object(1)).clone();
        deleted.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap());
        let action = reconcile(Arc::new(deleted), ctx.clone()).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(ctx.state.resource("ops/maid").await.is_none());
    }
}
