use std::fmt;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::core::client::kube_resources::Pod;
use crate::errors::InspectError;

/// A pod targeted by one admin query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodIdentity {
    pub name: String,
    pub namespace: String,
}

impl PodIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Lists the pods of a namespace that carry a sidecar proxy.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodIdentity>, InspectError>;
}

pub struct KubePodLister {
    client: Client,
    sidecar_container: String,
}

impl KubePodLister {
    pub fn new(client: Client, sidecar_container: impl Into<String>) -> Self {
        Self {
            client,
            sidecar_container: sidecar_container.into(),
        }
    }
}

#[async_trait]
impl PodLister for KubePodLister {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodIdentity>, InspectError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod_list = pods.list(&ListParams::default()).await.map_err(|e| {
            InspectError::transport(format!("pods in namespace '{namespace}'"), e.to_string())
        })?;

        debug!("Discovered {} pod(s) in namespace '{}'", pod_list.items.len(), namespace);
        Ok(select_sidecar_pods(&pod_list.items, &self.sidecar_container))
    }
}

/// Running pods with the sidecar container, in list order.
pub fn select_sidecar_pods(pods: &[Pod], sidecar_container: &str) -> Vec<PodIdentity> {
    pods.iter()
        .filter(|pod| is_running(pod))
        .filter_map(|pod| {
            let version = sidecar_version(pod, sidecar_container)?;
            let name = pod.metadata.name.clone()?;
            let namespace = pod.metadata.namespace.clone().unwrap_or_default();
            debug!(pod = %name, namespace = %namespace, proxy_version = %version, "Found sidecar");
            Some(PodIdentity { name, namespace })
        })
        .collect()
}

fn is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Running")
}

/// Proxy version taken from the sidecar image tag; `unknown` when the image
/// has no tag. `None` when the pod has no such container.
pub fn sidecar_version(pod: &Pod, sidecar_container: &str) -> Option<String> {
    let spec = pod.spec.as_ref()?;
    let container = spec.containers.iter().find(|c| c.name == sidecar_container)?;
    let image = container.image.as_deref().unwrap_or_default();
    let image = image.split('@').next().unwrap_or(image);
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    Some(match last_segment.split_once(':') {
        Some((_, tag)) if !tag.is_empty() => tag.to_string(),
        _ => "unknown".to_string(),
    })
}
