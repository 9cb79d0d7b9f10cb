use std::time::Duration;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::settings::DEFAULT_NAMESPACE;
use crate::core::util::duration::parse_duration;
use crate::domain::inspect::dto::render_request::RenderRequest;
use crate::domain::proxy_config::{CriteriaFields, ResourceKind};
use crate::errors::InspectError;

/// Names a namespace whose sidecars are inspected on a fixed cadence.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "clustermaid.io",
    version = "v1",
    kind = "ClusterMaid",
    plural = "clustermaids",
    shortname = "cmaid",
    namespaced,
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.namespace"}"#,
    printcolumn = r#"{"name":"Interval","type":"string","jsonPath":".spec.requeueInterval"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMaidSpec {
    /// Namespace to scan; `default` when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Go duration between passes; 10s when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requeue_interval: Option<String>,

    /// What to inspect on every pod; a route summary when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inspections: Vec<InspectionTarget>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionTarget {
    /// listener, route, cluster or endpoint
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_eds: Option<bool>,
}

impl InspectionTarget {
    pub fn to_request(&self) -> Result<RenderRequest, InspectError> {
        let kind: ResourceKind = self.kind.parse()?;
        let fields = CriteriaFields {
            name: self.name.clone(),
            address: self.address.clone(),
            port: self.port,
            fqdn: self.fqdn.clone(),
            subset: self.subset.clone(),
            direction: self.direction.clone(),
            verbose: self.verbose,
        };
        RenderRequest::new(
            kind,
            self.format.as_deref().unwrap_or("summary"),
            &fields,
            self.include_eds.unwrap_or(false),
        )
    }
}

/// The controlling resource as one reconciliation pass consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllingResource {
    /// `namespace/name` of the object, or a synthetic key without one.
    pub key: String,
    pub namespace: String,
    pub requeue_interval: Duration,
    pub requests: Vec<RenderRequest>,
    pub generation: Option<i64>,
}

impl ControllingResource {
    /// Resource used when no object is named: fallback namespace, route summary.
    pub fn fallback(key: impl Into<String>, namespace: Option<&str>, interval: Duration) -> Self {
        Self {
            key: key.into(),
            namespace: namespace
                .filter(|ns| !ns.trim().is_empty())
                .unwrap_or(DEFAULT_NAMESPACE)
                .to_string(),
            requeue_interval: interval,
            requests: vec![RenderRequest::route_summary()],
            generation: None,
        }
    }

    /// Apply defaults to an object's spec. Unusable values are logged and
    /// replaced; they never fail the conversion.
    pub fn from_object(object: &ClusterMaid, fallback_interval: Duration) -> Self {
        let key = format!(
            "{}/{}",
            object.namespace().unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            object.name_any()
        );
        let spec = &object.spec;

        let requeue_interval = match spec.requeue_interval.as_deref() {
            None => fallback_interval,
            Some(raw) => match parse_duration(raw) {
                Ok(d) if !d.is_zero() => d,
                Ok(_) => {
                    warn!(resource = %key, "requeueInterval is zero, using {:?}", fallback_interval);
                    fallback_interval
                }
                Err(e) => {
                    warn!(resource = %key, error = %e, "Invalid requeueInterval, using {:?}", fallback_interval);
                    fallback_interval
                }
            },
        };

        let mut requests: Vec<RenderRequest> = spec
            .inspections
            .iter()
            .enumerate()
            .filter_map(|(idx, target)| match target.to_request() {
                Ok(request) => Some(request),
                Err(e) => {
                    warn!(resource = %key, index = idx, kind = %target.kind, error = %e, "Dropping invalid inspection");
                    None
                }
            })
            .collect();
        if spec.inspections.is_empty() {
            requests.push(RenderRequest::route_summary());
        }

        let mut resource = Self::fallback(key, spec.namespace.as_deref(), requeue_interval);
        resource.requests = requests;
        resource.generation = object.metadata.generation;
        resource
    }
}
