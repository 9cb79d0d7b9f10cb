use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::client::pods::PodIdentity;
use crate::core::client::proxy_admin_client::{AdminQuery, ProxyAdminClient};
use crate::domain::inspect::dto::render_request::RenderRequest;
use crate::domain::proxy_config::{apply, decode, render, RawDump, RenderedOutput};
use crate::errors::InspectError;
use crate::scheduler::retry::{retry_with_backoff, RetryPolicy};

/// Stage of the per-pod pipeline that produced a failure. Filtering cannot
/// fail and so has no stage here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Fetch,
    Decode,
    Render,
    Emit,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineStage::Fetch => "fetch",
            PipelineStage::Decode => "decode",
            PipelineStage::Render => "render",
            PipelineStage::Emit => "emit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[serde(serialize_with = "serialize_display")]
    pub error: InspectError,
}

fn serialize_display<S: serde::Serializer>(err: &InspectError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

impl PipelineFailure {
    pub fn new(stage: PipelineStage, error: InspectError) -> Self {
        Self { stage, error }
    }
}

/// Fetch a dump, retrying transport failures within `retry`.
pub async fn fetch_dump(
    admin: &dyn ProxyAdminClient,
    pod: &PodIdentity,
    query: AdminQuery,
    retry: &RetryPolicy,
) -> Result<RawDump, InspectError> {
    let operation = format!("fetch {query} from {pod}");
    retry_with_backoff(retry, &operation, InspectError::is_transient, || {
        admin.fetch_dump(pod, query)
    })
    .await
}

/// Decode, filter and render an already fetched dump.
pub fn process_dump(raw: &RawDump, request: &RenderRequest) -> Result<RenderedOutput, PipelineFailure> {
    let fragment = decode(raw, request.kind())
        .map_err(|e| PipelineFailure::new(PipelineStage::Decode, e))?;
    let decoded = fragment.len();
    let filtered = apply(fragment, &request.criteria);
    debug!(
        kind = %request.kind(),
        decoded,
        retained = filtered.len(),
        "Filtered fragment"
    );
    render(&filtered, request.format).map_err(|e| PipelineFailure::new(PipelineStage::Render, e))
}

/// Run one request against one pod.
pub async fn inspect_pod(
    admin: &dyn ProxyAdminClient,
    pod: &PodIdentity,
    request: &RenderRequest,
    retry: &RetryPolicy,
) -> Result<RenderedOutput, PipelineFailure> {
    let raw = fetch_dump(admin, pod, request.admin_query(), retry)
        .await
        .map_err(|e| PipelineFailure::new(PipelineStage::Fetch, e))?;
    process_dump(&raw, request)
}

/// Run several requests against one pod, fetching each distinct admin
/// query once. Results come back in request order.
pub async fn inspect_pod_requests(
    admin: &dyn ProxyAdminClient,
    pod: &PodIdentity,
    requests: &[RenderRequest],
    retry: &RetryPolicy,
) -> Vec<Result<RenderedOutput, PipelineFailure>> {
    let mut dumps: HashMap<AdminQuery, Result<RawDump, InspectError>> = HashMap::new();
    let mut results = Vec::with_capacity(requests.len());

    for request in requests {
        let query = request.admin_query();
        if !dumps.contains_key(&query) {
            let fetched = fetch_dump(admin, pod, query, retry).await;
            dumps.insert(query, fetched);
        }
        let result = match dumps.get(&query) {
            Some(Ok(raw)) => process_dump(raw, request),
            Some(Err(e)) => Err(PipelineFailure::new(PipelineStage::Fetch, e.clone())),
            None => Err(PipelineFailure::new(
                PipelineStage::Fetch,
                InspectError::transport(pod.to_string(), format!("{query} was not fetched")),
            )),
        };
        results.push(result);
    }

    results
}
