use std::time::Duration;

use async_trait::async_trait;
use kube::{Api, Client};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::core::client::kube_client::{api_status, is_not_found};
use crate::core::crd::cluster_maid::{ClusterMaid, ControllingResource};
use crate::errors::InspectError;

/// Reads the controlling resource at the start of every pass.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControllingResourceSource: Send + Sync {
    async fn read(&self) -> Result<ControllingResource, InspectError>;
}

/// Reads one named `ClusterMaid` object.
pub struct KubeControllingResourceSource {
    api: Api<ClusterMaid>,
    namespace: String,
    name: String,
    fallback_interval: Duration,
}

impl KubeControllingResourceSource {
    pub fn new(client: Client, namespace: &str, name: &str, fallback_interval: Duration) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            name: name.to_string(),
            fallback_interval,
        }
    }
}

#[async_trait]
impl ControllingResourceSource for KubeControllingResourceSource {
    async fn read(&self) -> Result<ControllingResource, InspectError> {
        let object = self.api.get(&self.name).await.map_err(|e| {
            if is_not_found(&e) {
                InspectError::NotFound(format!("ClusterMaid {}/{}", self.namespace, self.name))
            } else {
                debug!(status = ?api_status(&e), "ClusterMaid read failed");
                InspectError::ConfigAccess(format!(
                    "ClusterMaid {}/{}: {}",
                    self.namespace, self.name, e
                ))
            }
        })?;
        Ok(ControllingResource::from_object(&object, self.fallback_interval))
    }
}

/// A fixed resource built from settings, for runs without a `ClusterMaid` object.
pub struct StaticControllingResourceSource {
    resource: ControllingResource,
}

impl StaticControllingResourceSource {
    pub fn new(resource: ControllingResource) -> Self {
        Self { resource }
    }
}

#[async_trait]
impl ControllingResourceSource for StaticControllingResourceSource {
    async fn read(&self) -> Result<ControllingResource, InspectError> {
        Ok(self.resource.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_returns_its_resource() {
        let resource = ControllingResource::fallback("standalone", None, Duration::from_secs(10));
        let source = StaticControllingResourceSource::new(resource.clone());
        assert_eq!(source.read().await.unwrap(), resource);
        assert_eq!(source.read().await.unwrap().namespace, "default");
    }
}
