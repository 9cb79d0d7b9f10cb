//! Decoded proxy configuration model.
//!
//! These types are what the decoder produces, what filters narrow and what
//! renderers print. They are plain data: once decoded, nothing mutates them
//! in place; filtering builds new collections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::errors::InspectError;

/// Proxy configuration resource kinds that can be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Listener,
    Route,
    Cluster,
    Endpoint,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Listener,
        ResourceKind::Route,
        ResourceKind::Cluster,
        ResourceKind::Endpoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Listener => "listener",
            ResourceKind::Route => "route",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Endpoint => "endpoint",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listener" | "listeners" => Ok(ResourceKind::Listener),
            "route" | "routes" => Ok(ResourceKind::Route),
            "cluster" | "clusters" => Ok(ResourceKind::Cluster),
            "endpoint" | "endpoints" => Ok(ResourceKind::Endpoint),
            other => Err(InspectError::invalid_criteria(format!(
                "unknown resource kind {other:?}"
            ))),
        }
    }
}

/// Traffic direction as reported by the proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficDirection {
    Inbound,
    Outbound,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl TrafficDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficDirection::Inbound => "inbound",
            TrafficDirection::Outbound => "outbound",
            TrafficDirection::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for TrafficDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficDirection {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbound" => Ok(TrafficDirection::Inbound),
            "outbound" => Ok(TrafficDirection::Outbound),
            "unspecified" => Ok(TrafficDirection::Unspecified),
            other => Err(InspectError::invalid_criteria(format!(
                "unknown traffic direction {other:?}, expected inbound, outbound or unspecified"
            ))),
        }
    }
}

/// Endpoint health as reported by EDS or the clusters admin page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Draining,
    Timeout,
    Degraded,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Unhealthy => "UNHEALTHY",
            HealthStatus::Draining => "DRAINING",
            HealthStatus::Timeout => "TIMEOUT",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerEntry {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub direction: TrafficDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHostEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHostEntry {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<RouteRuleEntry>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRuleEntry {
    pub name: Option<String>,
    #[serde(rename = "match")]
    pub match_rule: String,
    pub destination: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEntry {
    /// Raw cluster name as configured in the proxy.
    pub name: String,
    pub fqdn: String,
    pub port: Option<u16>,
    pub subset: Option<String>,
    pub direction: TrafficDirection,
    pub discovery_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub cluster: String,
    pub address: String,
    pub port: u16,
    pub status: HealthStatus,
    #[serde(default)]
    pub failed_outlier_check: bool,
}

/// All four resource collections of one pod's proxy at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub listeners: Vec<ListenerEntry>,
    pub routes: Vec<RouteEntry>,
    pub clusters: Vec<ClusterEntry>,
    pub endpoints: Vec<EndpointEntry>,
}

impl ConfigSnapshot {
    /// Clone out the collection of one kind.
    pub fn fragment(&self, kind: ResourceKind) -> ConfigFragment {
        match kind {
            ResourceKind::Listener => ConfigFragment::Listeners(self.listeners.clone()),
            ResourceKind::Route => ConfigFragment::Routes(self.routes.clone()),
            ResourceKind::Cluster => ConfigFragment::Clusters(self.clusters.clone()),
            ResourceKind::Endpoint => ConfigFragment::Endpoints(self.endpoints.clone()),
        }
    }
}

/// A single-kind slice of a snapshot. Serializes as the bare entry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigFragment {
    Listeners(Vec<ListenerEntry>),
    Routes(Vec<RouteEntry>),
    Clusters(Vec<ClusterEntry>),
    Endpoints(Vec<EndpointEntry>),
}

impl ConfigFragment {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ConfigFragment::Listeners(_) => ResourceKind::Listener,
            ConfigFragment::Routes(_) => ResourceKind::Route,
            ConfigFragment::Clusters(_) => ResourceKind::Cluster,
            ConfigFragment::Endpoints(_) => ResourceKind::Endpoint,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ConfigFragment::Listeners(v) => v.len(),
            ConfigFragment::Routes(v) => v.len(),
            ConfigFragment::Clusters(v) => v.len(),
            ConfigFragment::Endpoints(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_accepts_singular_and_plural() {
        assert_eq!("routes".parse::<ResourceKind>().unwrap(), ResourceKind::Route);
        assert_eq!("Endpoint".parse::<ResourceKind>().unwrap(), ResourceKind::Endpoint);
        assert!(matches!(
            "secrets".parse::<ResourceKind>(),
            Err(InspectError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn direction_parse_rejects_unknown_tokens() {
        assert_eq!("OUTBOUND".parse::<TrafficDirection>().unwrap(), TrafficDirection::Outbound);
        assert!(matches!(
            "sideways".parse::<TrafficDirection>(),
            Err(InspectError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn unknown_wire_health_status_falls_back() {
        let status: HealthStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, HealthStatus::Unknown);
    }

    #[test]
    fn fragment_serializes_as_bare_list() {
        let fragment = ConfigFragment::Listeners(vec![ListenerEntry {
            name: "0.0.0.0_80".into(),
            address: "0.0.0.0".into(),
            port: 80,
            direction: TrafficDirection::Outbound,
        }]);
        let value = serde_json::to_value(&fragment).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["direction"], "OUTBOUND");
    }
}
