//! Sidecar admin interface client.
//!
//! One call is a pod lookup plus one admin round trip, together bounded by
//! the configured timeout. The client never retries; retry policy lives
//! with the reconciliation pass.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{Method, Request as HttpRequest};
use kube::{Api, Client};
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::core::client::kube_client::pod_call_error;
use crate::core::client::kube_resources::Pod;
use crate::core::client::pods::PodIdentity;
use crate::core::settings::AdminTransport;
use crate::domain::proxy_config::RawDump;
use crate::errors::InspectError;

/// The fixed set of admin queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminQuery {
    ConfigDump { include_eds: bool },
    Clusters,
}

impl AdminQuery {
    pub fn path(&self) -> &'static str {
        match self {
            AdminQuery::ConfigDump { include_eds: false } => "config_dump",
            AdminQuery::ConfigDump { include_eds: true } => "config_dump?include_eds=true",
            AdminQuery::Clusters => "clusters?format=json",
        }
    }
}

impl fmt::Display for AdminQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProxyAdminClient: Send + Sync {
    async fn fetch_dump(&self, pod: &PodIdentity, query: AdminQuery) -> Result<RawDump, InspectError>;
}

/// Reaches the admin port through the API server's pod proxy subresource.
pub struct KubeProxyAdminClient {
    client: Client,
    admin_port: u16,
    timeout: Duration,
}

impl KubeProxyAdminClient {
    pub fn new(client: Client, admin_port: u16, timeout: Duration) -> Self {
        Self {
            client,
            admin_port,
            timeout,
        }
    }

    fn proxy_url(&self, pod: &PodIdentity, query: AdminQuery) -> String {
        format!(
            "/api/v1/namespaces/{}/pods/{}:{}/proxy/{}",
            urlencoding::encode(&pod.namespace),
            urlencoding::encode(&pod.name),
            self.admin_port,
            query.path()
        )
    }
}

impl KubeProxyAdminClient {
    async fn fetch(&self, pod: &PodIdentity, query: AdminQuery) -> Result<RawDump, InspectError> {
        let target = pod.to_string();
        resolve_pod(&self.client, pod).await?;

        let req = HttpRequest::builder()
            .method(Method::GET)
            .uri(self.proxy_url(pod, query))
            .body(vec![])
            .map_err(|e| InspectError::transport(&target, format!("failed to build request: {e}")))?;

        // the pod exists, so any failure here is the admin endpoint's
        let body = self
            .client
            .request_text(req)
            .await
            .map_err(|e| InspectError::transport(&target, format!("{query} failed: {e}")))?;

        debug!(pod = %target, query = %query, bytes = body.len(), "Fetched admin dump");
        Ok(RawDump::from(body))
    }
}

#[async_trait]
impl ProxyAdminClient for KubeProxyAdminClient {
    async fn fetch_dump(&self, pod: &PodIdentity, query: AdminQuery) -> Result<RawDump, InspectError> {
        bounded(self.timeout, pod, query, self.fetch(pod, query)).await
    }
}

/// Talks HTTP straight to the pod IP; needs network reachability to pods.
pub struct DirectAdminClient {
    client: Client,
    http: reqwest::Client,
    admin_port: u16,
    timeout: Duration,
}

impl DirectAdminClient {
    pub fn new(client: Client, admin_port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            http,
            admin_port,
            timeout,
        })
    }

    async fn fetch(&self, pod: &PodIdentity, query: AdminQuery) -> Result<RawDump, InspectError> {
        let target = pod.to_string();
        let ip = resolve_pod(&self.client, pod)
            .await?
            .status
            .and_then(|s| s.pod_ip)
            .ok_or_else(|| InspectError::transport(&target, "pod has no IP assigned"))?;

        let url = format!("http://{}/{}", socket_host(&ip, self.admin_port), query.path());
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| InspectError::transport(&target, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InspectError::transport(
                &target,
                format!("{query} answered {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| InspectError::transport(&target, e.to_string()))?;
        debug!(pod = %target, url = %url, bytes = bytes.len(), "Fetched admin dump");
        Ok(RawDump::from(bytes.to_vec()))
    }
}

#[async_trait]
impl ProxyAdminClient for DirectAdminClient {
    async fn fetch_dump(&self, pod: &PodIdentity, query: AdminQuery) -> Result<RawDump, InspectError> {
        bounded(self.timeout, pod, query, self.fetch(pod, query)).await
    }
}

/// Look the pod up first so a missing pod is `NotFound` on every transport.
async fn resolve_pod(client: &Client, pod: &PodIdentity) -> Result<Pod, InspectError> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), &pod.namespace);
    pods.get(&pod.name)
        .await
        .map_err(|e| pod_call_error(&pod.to_string(), e))
}

/// Whole call, pod lookup included, bounded by `timeout`.
async fn bounded<F>(
    timeout: Duration,
    pod: &PodIdentity,
    query: AdminQuery,
    fetch: F,
) -> Result<RawDump, InspectError>
where
    F: Future<Output = Result<RawDump, InspectError>>,
{
    tokio::time::timeout(timeout, fetch).await.map_err(|_| {
        InspectError::transport(pod.to_string(), format!("{query} timed out after {timeout:?}"))
    })?
}

fn socket_host(ip: &str, port: u16) -> String {
    if ip.contains(':') {
        format!("[{ip}]:{port}")
    } else {
        format!("{ip}:{port}")
    }
}

pub fn build_admin_client(
    client: Client,
    transport: AdminTransport,
    admin_port: u16,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn ProxyAdminClient>> {
    Ok(match transport {
        AdminTransport::Proxy => Arc::new(KubeProxyAdminClient::new(client, admin_port, timeout)),
        AdminTransport::Direct => Arc::new(DirectAdminClient::new(client, admin_port, timeout)?),
    })
}
