use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::client::pods::{PodIdentity, PodLister};
use crate::core::client::proxy_admin_client::ProxyAdminClient;
use crate::core::crd::cluster_maid::ControllingResource;
use crate::core::output::sink::OutputSink;
use crate::core::state::runtime::reconcile::reconcile_runtime_state::PassCounts;
use crate::core::state::runtime::reconcile::ReconcileStateManager;
use crate::domain::inspect::service::inspect_service::{
    inspect_pod_requests, PipelineFailure, PipelineStage,
};
use crate::domain::proxy_config::RenderedOutput;
use crate::errors::InspectError;
use crate::scheduler::retry::RetryPolicy;

/// Capabilities one reconciliation pass works with.
#[derive(Clone)]
pub struct PassContext {
    pub pods: Arc<dyn PodLister>,
    pub admin: Arc<dyn ProxyAdminClient>,
    pub sink: Arc<dyn OutputSink>,
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodReport {
    pub pod: PodIdentity,
    pub emitted: Vec<RenderedOutput>,
    pub failures: Vec<PipelineFailure>,
}

impl PodReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub resource: String,
    pub namespace: String,
    /// Attempted pods, in listing order.
    pub pods: Vec<PodReport>,
    /// Pods left untouched because the pass was cancelled.
    pub abandoned: Vec<PodIdentity>,
}

impl PassReport {
    pub fn counts(&self) -> PassCounts {
        let succeeded = self.pods.iter().filter(|p| p.succeeded()).count();
        PassCounts {
            pods: self.pods.len() + self.abandoned.len(),
            succeeded,
            failed: self.pods.len() - succeeded,
            abandoned: self.abandoned.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Pods could not be listed; nothing was attempted.
    Skipped(InspectError),
}

enum PodRun {
    Done(PodReport),
    Abandoned(PodIdentity),
}

async fn run_pod(
    ctx: &PassContext,
    resource: &ControllingResource,
    pass_id: Uuid,
    pod: PodIdentity,
    cancel: &CancellationToken,
) -> PodRun {
    if cancel.is_cancelled() {
        return PodRun::Abandoned(pod);
    }

    let results = tokio::select! {
        _ = cancel.cancelled() => return PodRun::Abandoned(pod),
        results = inspect_pod_requests(ctx.admin.as_ref(), &pod, &resource.requests, &ctx.retry) => results,
    };

    // nothing of a pod is emitted once shutdown has started
    if cancel.is_cancelled() {
        return PodRun::Abandoned(pod);
    }

    let mut report = PodReport {
        pod,
        emitted: Vec::new(),
        failures: Vec::new(),
    };
    for result in results {
        let failure = match result {
            Ok(output) => match ctx.sink.emit(&report.pod, &output).await {
                Ok(()) => {
                    report.emitted.push(output);
                    continue;
                }
                Err(e) => PipelineFailure::new(PipelineStage::Emit, e),
            },
            Err(failure) => failure,
        };
        warn!(
            pass_id = %pass_id,
            pod = %report.pod,
            stage = %failure.stage,
            error = %failure.error,
            "Pod inspection failed"
        );
        report.failures.push(failure);
    }
    PodRun::Done(report)
}

/// One pass over every sidecar pod of the resource's namespace.
///
/// Per-pod failures are recorded in the report and never stop the pass.
pub async fn run_pass(
    ctx: &PassContext,
    resource: &ControllingResource,
    pass_id: Uuid,
    cancel: &CancellationToken,
) -> PassOutcome {
    // --- Step 1: list target pods ---
    let pods = match ctx.pods.list_pods(&resource.namespace).await {
        Ok(pods) => pods,
        Err(e) => return PassOutcome::Skipped(e),
    };
    debug!(
        pass_id = %pass_id,
        namespace = %resource.namespace,
        "Inspecting {} pod(s) with {} request(s)",
        pods.len(),
        resource.requests.len()
    );

    // --- Step 2: run the pipeline per pod, bounded, keeping listing order ---
    let runs: Vec<PodRun> = stream::iter(pods)
        .map(|pod| run_pod(ctx, resource, pass_id, pod, cancel))
        .buffered(ctx.max_concurrency.max(1))
        .collect()
        .await;

    let mut report = PassReport {
        pass_id,
        resource: resource.key.clone(),
        namespace: resource.namespace.clone(),
        pods: Vec::new(),
        abandoned: Vec::new(),
    };
    for run in runs {
        match run {
            PodRun::Done(pod) => report.pods.push(pod),
            PodRun::Abandoned(pod) => report.abandoned.push(pod),
        }
    }
    PassOutcome::Completed(report)
}

/// Run a pass and record it in the runtime state.
pub async fn execute_pass(
    ctx: &PassContext,
    state: &ReconcileStateManager,
    resource: &ControllingResource,
    cancel: &CancellationToken,
) -> PassOutcome {
    let pass_id = Uuid::new_v4();
    state
        .begin_pass(&resource.key, pass_id, &resource.namespace, resource.generation)
        .await;

    let outcome = run_pass(ctx, resource, pass_id, cancel).await;
    match &outcome {
        PassOutcome::Completed(report) => {
            let counts = report.counts();
            state
                .complete_pass(&resource.key, counts, resource.requeue_interval)
                .await;
            if counts.abandoned > 0 {
                info!(
                    pass_id = %pass_id,
                    resource = %resource.key,
                    "Pass cancelled with {} pod(s) not attempted",
                    counts.abandoned
                );
            }
            info!(
                pass_id = %pass_id,
                resource = %resource.key,
                namespace = %resource.namespace,
                pods = counts.pods,
                succeeded = counts.succeeded,
                failed = counts.failed,
                "Reconciliation pass finished"
            );
        }
        PassOutcome::Skipped(e) => {
            error!(
                pass_id = %pass_id,
                resource = %resource.key,
                namespace = %resource.namespace,
                error = %e,
                "Cannot list pods, skipping pass"
            );
            state
                .skip_pass(&resource.key, format!("pod listing failed: {e}"))
                .await;
        }
    }
    outcome
}
