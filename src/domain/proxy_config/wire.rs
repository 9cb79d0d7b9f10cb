//! Serde shapes of the Envoy admin payloads.
//!
//! Only the fields the model needs are declared; everything else in the
//! payload is ignored so newer proxies keep decoding. Fields that proto3 JSON
//! omits when zero/empty carry `#[serde(default)]`, fields without which an
//! entry is meaningless do not.

use serde::Deserialize;
use serde_json::Value;

use super::model::{HealthStatus, TrafficDirection};

pub const LISTENERS_DUMP_TYPE: &str = "envoy.admin.v3.ListenersConfigDump";
pub const ROUTES_DUMP_TYPE: &str = "envoy.admin.v3.RoutesConfigDump";
pub const CLUSTERS_DUMP_TYPE: &str = "envoy.admin.v3.ClustersConfigDump";
pub const ENDPOINTS_DUMP_TYPE: &str = "envoy.admin.v3.EndpointsConfigDump";

/// Top level of `config_dump`.
#[derive(Debug, Deserialize)]
pub struct ConfigDumpWire {
    pub configs: Vec<Value>,
}

impl ConfigDumpWire {
    /// Find the section whose `@type` ends with `type_name`.
    pub fn section(&self, type_name: &str) -> Option<&Value> {
        self.configs.iter().find(|config| {
            config
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with(type_name))
        })
    }
}

// ---------- addresses ----------

#[derive(Debug, Deserialize)]
pub struct AddressWire {
    pub socket_address: Option<SocketAddressWire>,
    pub envoy_internal_address: Option<InternalAddressWire>,
    pub pipe: Option<PipeWire>,
}

#[derive(Debug, Deserialize)]
pub struct SocketAddressWire {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port_value: u16,
}

#[derive(Debug, Deserialize)]
pub struct InternalAddressWire {
    #[serde(default)]
    pub server_listener_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PipeWire {
    pub path: String,
}

// ---------- listeners ----------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListenersConfigDump {
    pub static_listeners: Vec<StaticListenerWire>,
    pub dynamic_listeners: Vec<DynamicListenerWire>,
}

#[derive(Debug, Deserialize)]
pub struct StaticListenerWire {
    pub listener: ListenerWire,
}

#[derive(Debug, Deserialize)]
pub struct DynamicListenerWire {
    #[serde(default)]
    pub name: String,
    pub active_state: Option<ListenerStateWire>,
}

#[derive(Debug, Deserialize)]
pub struct ListenerStateWire {
    pub listener: ListenerWire,
}

#[derive(Debug, Deserialize)]
pub struct ListenerWire {
    #[serde(default)]
    pub name: String,
    pub address: AddressWire,
    #[serde(default)]
    pub traffic_direction: TrafficDirection,
}

// ---------- routes ----------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoutesConfigDump {
    pub static_route_configs: Vec<RouteConfigHolderWire>,
    pub dynamic_route_configs: Vec<RouteConfigHolderWire>,
}

#[derive(Debug, Deserialize)]
pub struct RouteConfigHolderWire {
    pub route_config: RouteConfigWire,
}

#[derive(Debug, Deserialize)]
pub struct RouteConfigWire {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub virtual_hosts: Vec<VirtualHostWire>,
}

#[derive(Debug, Deserialize)]
pub struct VirtualHostWire {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteWire>,
}

#[derive(Debug, Deserialize)]
pub struct RouteWire {
    pub name: Option<String>,
    #[serde(rename = "match", default)]
    pub match_rule: RouteMatchWire,
    pub route: Option<RouteActionWire>,
    pub redirect: Option<Value>,
    pub direct_response: Option<Value>,
    pub non_forwarding_action: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteMatchWire {
    pub prefix: Option<String>,
    pub path: Option<String>,
    pub path_separated_prefix: Option<String>,
    pub safe_regex: Option<RegexWire>,
    pub connect_matcher: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RegexWire {
    pub regex: String,
}

#[derive(Debug, Deserialize)]
pub struct RouteActionWire {
    pub cluster: Option<String>,
    pub cluster_header: Option<String>,
    pub weighted_clusters: Option<WeightedClustersWire>,
}

#[derive(Debug, Deserialize)]
pub struct WeightedClustersWire {
    #[serde(default)]
    pub clusters: Vec<WeightedClusterWire>,
}

#[derive(Debug, Deserialize)]
pub struct WeightedClusterWire {
    pub name: String,
    pub weight: Option<u32>,
}

// ---------- clusters ----------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClustersConfigDump {
    pub static_clusters: Vec<ClusterHolderWire>,
    pub dynamic_active_clusters: Vec<ClusterHolderWire>,
    pub dynamic_warming_clusters: Vec<ClusterHolderWire>,
}

#[derive(Debug, Deserialize)]
pub struct ClusterHolderWire {
    pub cluster: ClusterWire,
}

#[derive(Debug, Deserialize)]
pub struct ClusterWire {
    pub name: String,
    #[serde(rename = "type")]
    pub discovery_type: Option<String>,
    pub cluster_type: Option<CustomClusterTypeWire>,
}

#[derive(Debug, Deserialize)]
pub struct CustomClusterTypeWire {
    pub name: String,
}

// ---------- endpoints (EDS section of config_dump) ----------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EndpointsConfigDump {
    pub static_endpoint_configs: Vec<EndpointConfigHolderWire>,
    pub dynamic_endpoint_configs: Vec<EndpointConfigHolderWire>,
}

#[derive(Debug, Deserialize)]
pub struct EndpointConfigHolderWire {
    pub endpoint_config: ClusterLoadAssignmentWire,
}

#[derive(Debug, Deserialize)]
pub struct ClusterLoadAssignmentWire {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub endpoints: Vec<LocalityLbEndpointsWire>,
}

#[derive(Debug, Deserialize)]
pub struct LocalityLbEndpointsWire {
    #[serde(default)]
    pub lb_endpoints: Vec<LbEndpointWire>,
}

#[derive(Debug, Deserialize)]
pub struct LbEndpointWire {
    pub endpoint: Option<EndpointAddressWire>,
    #[serde(default)]
    pub health_status: HealthStatus,
}

#[derive(Debug, Deserialize)]
pub struct EndpointAddressWire {
    pub address: AddressWire,
}

// ---------- clusters?format=json ----------

#[derive(Debug, Deserialize)]
pub struct ClustersAdminWire {
    pub cluster_statuses: Vec<ClusterStatusWire>,
}

#[derive(Debug, Deserialize)]
pub struct ClusterStatusWire {
    pub name: String,
    #[serde(default)]
    pub host_statuses: Vec<HostStatusWire>,
}

#[derive(Debug, Deserialize)]
pub struct HostStatusWire {
    pub address: AddressWire,
    #[serde(default)]
    pub health_status: HostHealthWire,
}

#[derive(Debug, Default, Deserialize)]
pub struct HostHealthWire {
    #[serde(default)]
    pub eds_health_status: HealthStatus,
    #[serde(default)]
    pub failed_outlier_check: bool,
}
