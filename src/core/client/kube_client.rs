use anyhow::{Context, Result};
use kube::Client;
use tracing::debug;

use crate::errors::InspectError;

/// Creates a Kubernetes client from the in-cluster service account or the
/// local kubeconfig, whichever `kube` finds first.
pub async fn build_kube_client() -> Result<Client> {
    let client = Client::try_default()
        .await
        .context("cannot build Kubernetes client from in-cluster config or kubeconfig")?;

    debug!(
        default_namespace = client.default_namespace(),
        "Kubernetes client initialized"
    );
    Ok(client)
}

pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(e) if e.code == 404)
}

/// HTTP status of an API error, if the error came from the API server.
pub fn api_status(err: &kube::Error) -> Option<u16> {
    match err {
        kube::Error::Api(e) => Some(e.code),
        _ => None,
    }
}

/// Map a failed pod-scoped call: 404 is `NotFound`, anything else is a
/// transport failure against `target`.
pub fn pod_call_error(target: &str, err: kube::Error) -> InspectError {
    if is_not_found(&err) {
        InspectError::NotFound(target.to_string())
    } else {
        InspectError::transport(target, err.to_string())
    }
}
