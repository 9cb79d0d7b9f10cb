//! Decodes raw admin payloads into the configuration model.
//!
//! Decoding is pure: the same bytes always give the same entries, in the
//! order the proxy reported them. A resource kind either decodes completely
//! or yields a `MalformedDump` error; there is no partially filled result.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::proxy_config::cluster_name::ClusterName;
use crate::domain::proxy_config::model::{
    ClusterEntry, ConfigFragment, ConfigSnapshot, EndpointEntry, ListenerEntry, ResourceKind,
    RouteEntry, RouteRuleEntry, VirtualHostEntry,
};
use crate::domain::proxy_config::wire::{
    AddressWire, ClustersAdminWire, ClustersConfigDump, ConfigDumpWire, EndpointsConfigDump,
    ListenersConfigDump, RouteMatchWire, RouteWire, RoutesConfigDump, CLUSTERS_DUMP_TYPE,
    ENDPOINTS_DUMP_TYPE, LISTENERS_DUMP_TYPE, ROUTES_DUMP_TYPE,
};
use crate::errors::InspectError;

/// Bytes returned by a sidecar admin endpoint, not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDump(Vec<u8>);

impl RawDump {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawDump {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for RawDump {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<&str> for RawDump {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Result of decoding every kind out of one full dump.
#[derive(Debug, Clone, Default)]
pub struct DecodedSnapshot {
    pub snapshot: ConfigSnapshot,
    /// Kinds that failed to decode; their collections in `snapshot` are empty.
    pub failures: Vec<(ResourceKind, InspectError)>,
}

/// Decode the payload for one resource kind.
///
/// Listeners, routes and clusters need a full `config_dump`. Endpoints are
/// read from a `clusters?format=json` payload, or from the EDS section of a
/// `config_dump?include_eds=true` payload.
pub fn decode(raw: &RawDump, kind: ResourceKind) -> Result<ConfigFragment, InspectError> {
    let value = parse_object(raw, kind)?;

    match kind {
        ResourceKind::Listener => {
            let dump = config_dump(&value, kind)?;
            Ok(ConfigFragment::Listeners(listeners_from(&dump)?))
        }
        ResourceKind::Route => {
            let dump = config_dump(&value, kind)?;
            Ok(ConfigFragment::Routes(routes_from(&dump)?))
        }
        ResourceKind::Cluster => {
            let dump = config_dump(&value, kind)?;
            Ok(ConfigFragment::Clusters(clusters_from(&dump)?))
        }
        ResourceKind::Endpoint => {
            let endpoints = if value.get("configs").is_some() {
                let dump = config_dump(&value, kind)?;
                if dump.section(ENDPOINTS_DUMP_TYPE).is_none() {
                    return Err(InspectError::malformed(
                        kind,
                        "config dump carries no endpoint section; request it with include_eds=true",
                    ));
                }
                eds_endpoints_from(&dump)?
            } else {
                admin_endpoints_from(&value)?
            };
            Ok(ConfigFragment::Endpoints(endpoints))
        }
    }
}

/// Decode every kind present in a full `config_dump`.
///
/// Endpoints are only decoded when the dump carries an EDS section.
pub fn decode_snapshot(raw: &RawDump) -> DecodedSnapshot {
    let mut decoded = DecodedSnapshot::default();

    let dump = match parse_object(raw, ResourceKind::Listener)
        .and_then(|value| config_dump(&value, ResourceKind::Listener))
    {
        Ok(dump) => dump,
        Err(err) => {
            decoded.failures = ResourceKind::ALL
                .iter()
                .map(|kind| (*kind, relabel(err.clone(), *kind)))
                .collect();
            return decoded;
        }
    };

    match listeners_from(&dump) {
        Ok(listeners) => decoded.snapshot.listeners = listeners,
        Err(err) => decoded.failures.push((ResourceKind::Listener, err)),
    }
    match routes_from(&dump) {
        Ok(routes) => decoded.snapshot.routes = routes,
        Err(err) => decoded.failures.push((ResourceKind::Route, err)),
    }
    match clusters_from(&dump) {
        Ok(clusters) => decoded.snapshot.clusters = clusters,
        Err(err) => decoded.failures.push((ResourceKind::Cluster, err)),
    }
    if dump.section(ENDPOINTS_DUMP_TYPE).is_some() {
        match eds_endpoints_from(&dump) {
            Ok(endpoints) => decoded.snapshot.endpoints = endpoints,
            Err(err) => decoded.failures.push((ResourceKind::Endpoint, err)),
        }
    }

    decoded
}

fn relabel(err: InspectError, kind: ResourceKind) -> InspectError {
    match err {
        InspectError::MalformedDump { message, .. } => InspectError::malformed(kind, message),
        other => other,
    }
}

fn parse_object(raw: &RawDump, kind: ResourceKind) -> Result<Value, InspectError> {
    let value: Value = serde_json::from_slice(raw.as_bytes())
        .map_err(|e| InspectError::malformed(kind, format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(InspectError::malformed(kind, "expected a JSON object at top level"));
    }
    Ok(value)
}

fn config_dump(value: &Value, kind: ResourceKind) -> Result<ConfigDumpWire, InspectError> {
    ConfigDumpWire::deserialize(value)
        .map_err(|e| InspectError::malformed(kind, format!("not a config dump: {e}")))
}

/// Decode a typed section; an absent section is an empty one.
fn section<T>(dump: &ConfigDumpWire, type_name: &str, kind: ResourceKind) -> Result<T, InspectError>
where
    T: DeserializeOwned + Default,
{
    match dump.section(type_name) {
        None => Ok(T::default()),
        Some(value) => T::deserialize(value)
            .map_err(|e| InspectError::malformed(kind, format!("{type_name}: {e}"))),
    }
}

fn address_parts(address: &AddressWire, kind: ResourceKind) -> Result<(String, u16), InspectError> {
    if let Some(socket) = &address.socket_address {
        return Ok((socket.address.clone(), socket.port_value));
    }
    if let Some(internal) = &address.envoy_internal_address {
        return Ok((format!("envoy://{}", internal.server_listener_name), 0));
    }
    if let Some(pipe) = &address.pipe {
        return Ok((pipe.path.clone(), 0));
    }
    Err(InspectError::malformed(
        kind,
        "address has neither socket_address, envoy_internal_address nor pipe",
    ))
}

fn listeners_from(dump: &ConfigDumpWire) -> Result<Vec<ListenerEntry>, InspectError> {
    let kind = ResourceKind::Listener;
    let wire: ListenersConfigDump = section(dump, LISTENERS_DUMP_TYPE, kind)?;

    let statics = wire.static_listeners.iter().map(|s| (&s.listener, ""));
    let dynamics = wire
        .dynamic_listeners
        .iter()
        .filter_map(|d| d.active_state.as_ref().map(|a| (&a.listener, d.name.as_str())));

    statics
        .chain(dynamics)
        .map(|(listener, fallback_name)| -> Result<ListenerEntry, InspectError> {
            let (address, port) = address_parts(&listener.address, kind)?;
            let name = if listener.name.is_empty() {
                fallback_name.to_string()
            } else {
                listener.name.clone()
            };
            Ok(ListenerEntry {
                name,
                address,
                port,
                direction: listener.traffic_direction,
            })
        })
        .collect()
}

fn routes_from(dump: &ConfigDumpWire) -> Result<Vec<RouteEntry>, InspectError> {
    let wire: RoutesConfigDump = section(dump, ROUTES_DUMP_TYPE, ResourceKind::Route)?;

    let entries = wire
        .static_route_configs
        .iter()
        .chain(wire.dynamic_route_configs.iter())
        .map(|holder| {
            let config = &holder.route_config;
            RouteEntry {
                name: config.name.clone(),
                virtual_hosts: config
                    .virtual_hosts
                    .iter()
                    .map(|vhost| VirtualHostEntry {
                        name: vhost.name.clone(),
                        domains: vhost.domains.clone(),
                        routes: vhost.routes.iter().map(route_rule).collect(),
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(entries)
}

fn route_rule(route: &RouteWire) -> RouteRuleEntry {
    RouteRuleEntry {
        name: route.name.clone().filter(|n| !n.is_empty()),
        match_rule: describe_match(&route.match_rule),
        destination: describe_destination(route),
    }
}

fn describe_match(m: &RouteMatchWire) -> String {
    if let Some(prefix) = &m.prefix {
        return match prefix.as_str() {
            "" => "*".to_string(),
            "/" => "/*".to_string(),
            p => format!("{p}*"),
        };
    }
    if let Some(path) = &m.path {
        return path.clone();
    }
    if let Some(prefix) = &m.path_separated_prefix {
        return format!("{prefix}/*");
    }
    if let Some(regex) = &m.safe_regex {
        return format!("regex:{}", regex.regex);
    }
    if m.connect_matcher.is_some() {
        return "CONNECT".to_string();
    }
    "*".to_string()
}

fn describe_destination(route: &RouteWire) -> String {
    if let Some(action) = &route.route {
        if let Some(cluster) = &action.cluster {
            return cluster.clone();
        }
        if let Some(weighted) = &action.weighted_clusters {
            return weighted
                .clusters
                .iter()
                .map(|c| match c.weight {
                    Some(w) => format!("{}:{}", c.name, w),
                    None => c.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(",");
        }
        if let Some(header) = &action.cluster_header {
            return format!("cluster_header:{header}");
        }
    }
    if route.redirect.is_some() {
        return "redirect".to_string();
    }
    if route.direct_response.is_some() {
        return "direct_response".to_string();
    }
    if route.non_forwarding_action.is_some() {
        return "non_forwarding".to_string();
    }
    "-".to_string()
}

fn clusters_from(dump: &ConfigDumpWire) -> Result<Vec<ClusterEntry>, InspectError> {
    let wire: ClustersConfigDump = section(dump, CLUSTERS_DUMP_TYPE, ResourceKind::Cluster)?;

    let entries = wire
        .static_clusters
        .iter()
        .chain(wire.dynamic_active_clusters.iter())
        .chain(wire.dynamic_warming_clusters.iter())
        .map(|holder| {
            let cluster = &holder.cluster;
            let parsed = ClusterName::parse(&cluster.name);
            let discovery_type = match (&cluster.cluster_type, &cluster.discovery_type) {
                (Some(custom), _) => custom.name.clone(),
                (None, Some(t)) => t.clone(),
                (None, None) => "STATIC".to_string(),
            };
            ClusterEntry {
                name: cluster.name.clone(),
                fqdn: parsed.fqdn,
                port: parsed.port,
                subset: parsed.subset,
                direction: parsed.direction,
                discovery_type,
            }
        })
        .collect();

    Ok(entries)
}

fn eds_endpoints_from(dump: &ConfigDumpWire) -> Result<Vec<EndpointEntry>, InspectError> {
    let kind = ResourceKind::Endpoint;
    let wire: EndpointsConfigDump = section(dump, ENDPOINTS_DUMP_TYPE, kind)?;

    let mut entries = Vec::new();
    for holder in wire
        .static_endpoint_configs
        .iter()
        .chain(wire.dynamic_endpoint_configs.iter())
    {
        let assignment = &holder.endpoint_config;
        for lb in assignment.endpoints.iter().flat_map(|l| l.lb_endpoints.iter()) {
            let endpoint = lb.endpoint.as_ref().ok_or_else(|| {
                InspectError::malformed(
                    kind,
                    format!("lb endpoint of {} has no endpoint", assignment.cluster_name),
                )
            })?;
            let (address, port) = address_parts(&endpoint.address, kind)?;
            entries.push(EndpointEntry {
                cluster: assignment.cluster_name.clone(),
                address,
                port,
                status: lb.health_status,
                failed_outlier_check: false,
            });
        }
    }

    Ok(entries)
}

fn admin_endpoints_from(value: &Value) -> Result<Vec<EndpointEntry>, InspectError> {
    let kind = ResourceKind::Endpoint;
    let wire = ClustersAdminWire::deserialize(value)
        .map_err(|e| InspectError::malformed(kind, format!("not a clusters dump: {e}")))?;

    let mut entries = Vec::new();
    for cluster in &wire.cluster_statuses {
        for host in &cluster.host_statuses {
            let (address, port) = address_parts(&host.address, kind)?;
            entries.push(EndpointEntry {
                cluster: cluster.name.clone(),
                address,
                port,
                status: host.health_status.eds_health_status,
                failed_outlier_check: host.health_status.failed_outlier_check,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proxy_config::model::{HealthStatus, TrafficDirection};

    const CONFIG_DUMP: &str = include_str!("testdata/config_dump.json");
    const CONFIG_DUMP_EDS: &str = include_str!("testdata/config_dump_eds.json");
    const CLUSTERS_DUMP: &str = include_str!("testdata/clusters.json");

    fn listeners(fragment: ConfigFragment) -> Vec<ListenerEntry> {
        match fragment {
            ConfigFragment::Listeners(v) => v,
            other => panic!("expected listeners, got {:?}", other.kind()),
        }
    }

    #[test]
    fn decodes_static_and_dynamic_listeners_in_order() {
        let entries = listeners(decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Listener).unwrap());
        let ports: Vec<u16> = entries.iter().map(|l| l.port).collect();
        assert_eq!(ports, vec![15090, 80, 443]);
        assert_eq!(entries[0].name, "prometheus_stats_listener");
        assert_eq!(entries[1].direction, TrafficDirection::Outbound);
        assert_eq!(entries[2].address, "10.0.0.12");
        assert_eq!(entries[2].direction, TrafficDirection::Inbound);
    }

    #[test]
    fn warming_only_listeners_are_not_reported() {
        let entries = listeners(decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Listener).unwrap());
        assert!(entries.iter().all(|l| l.name != "0.0.0.0_8443"));
    }

    #[test]
    fn decodes_routes_with_virtual_hosts_and_rules() {
        let ConfigFragment::Routes(routes) =
            decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Route).unwrap()
        else {
            panic!("expected routes");
        };

        let names: Vec<&str> = routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["InboundPassthroughCluster", "9080", "http.80"]);

        let reviews = &routes[1].virtual_hosts[0];
        assert_eq!(reviews.name, "reviews.default.svc.cluster.local:9080");
        assert_eq!(reviews.domains.len(), 2);
        assert_eq!(reviews.routes[0].match_rule, "/api*");
        assert_eq!(
            reviews.routes[0].destination,
            "outbound|9080|v1|reviews.default.svc.cluster.local:70,outbound|9080|v2|reviews.default.svc.cluster.local:30"
        );
        assert_eq!(reviews.routes[1].match_rule, "/*");
        assert_eq!(reviews.routes[1].name.as_deref(), Some("default"));

        let blackhole = &routes[1].virtual_hosts[1];
        assert_eq!(blackhole.routes[0].match_rule, "*");
        assert_eq!(blackhole.routes[0].destination, "direct_response");
    }

    #[test]
    fn decodes_clusters_and_splits_mesh_names() {
        let ConfigFragment::Clusters(clusters) =
            decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Cluster).unwrap()
        else {
            panic!("expected clusters");
        };

        assert_eq!(clusters.len(), 5);
        assert_eq!(clusters[0].fqdn, "BlackHoleCluster");
        assert_eq!(clusters[0].discovery_type, "STATIC");
        let v1 = clusters.iter().find(|c| c.subset.as_deref() == Some("v1")).unwrap();
        assert_eq!(v1.port, Some(9080));
        assert_eq!(v1.direction, TrafficDirection::Outbound);
        assert_eq!(v1.discovery_type, "EDS");
        let passthrough = clusters.iter().find(|c| c.name == "PassthroughCluster").unwrap();
        assert_eq!(passthrough.discovery_type, "ORIGINAL_DST");
        let inbound = clusters.iter().find(|c| c.name == "inbound|8080||").unwrap();
        assert_eq!(inbound.direction, TrafficDirection::Inbound);
    }

    #[test]
    fn decodes_endpoints_from_clusters_dump() {
        let ConfigFragment::Endpoints(endpoints) =
            decode(&RawDump::from(CLUSTERS_DUMP), ResourceKind::Endpoint).unwrap()
        else {
            panic!("expected endpoints");
        };

        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[0].address, "10.0.1.5");
        assert_eq!(endpoints[0].port, 9080);
        assert_eq!(endpoints[0].status, HealthStatus::Healthy);
        assert_eq!(endpoints[1].status, HealthStatus::Unhealthy);
        assert!(endpoints[1].failed_outlier_check);
        // proto3 omits the zero enum value
        assert_eq!(endpoints[2].status, HealthStatus::Unknown);
    }

    #[test]
    fn decodes_endpoints_from_eds_section() {
        let ConfigFragment::Endpoints(endpoints) =
            decode(&RawDump::from(CONFIG_DUMP_EDS), ResourceKind::Endpoint).unwrap()
        else {
            panic!("expected endpoints");
        };

        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].cluster, "outbound|9080|v1|reviews.default.svc.cluster.local");
        assert_eq!(endpoints[1].status, HealthStatus::Draining);
    }

    #[test]
    fn endpoints_from_plain_config_dump_are_malformed() {
        let err = decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Endpoint).unwrap_err();
        assert!(matches!(err, InspectError::MalformedDump { ref kind, .. } if kind == "endpoint"));
    }

    #[test]
    fn admin_error_body_is_not_an_endpoint_list() {
        for body in [r#"{"error":"admin unavailable"}"#, "{}"] {
            let err = decode(&RawDump::from(body), ResourceKind::Endpoint).unwrap_err();
            assert!(
                matches!(err, InspectError::MalformedDump { ref kind, .. } if kind == "endpoint"),
                "{body}: {err}"
            );
        }
    }

    #[test]
    fn clusters_dump_is_not_a_config_dump() {
        for kind in [ResourceKind::Listener, ResourceKind::Route, ResourceKind::Cluster] {
            let err = decode(&RawDump::from(CLUSTERS_DUMP), kind).unwrap_err();
            assert!(matches!(err, InspectError::MalformedDump { .. }), "{kind}: {err}");
        }
    }

    #[test]
    fn mistyped_required_fields_are_malformed() {
        let raw = RawDump::from(
            r#"{"configs":[{"@type":"type.googleapis.com/envoy.admin.v3.ListenersConfigDump",
                "static_listeners":[{"listener":{"name":"x","address":{"socket_address":{"address":"0.0.0.0","port_value":"eighty"}}}}]}]}"#,
        );
        assert!(matches!(
            decode(&raw, ResourceKind::Listener),
            Err(InspectError::MalformedDump { .. })
        ));

        let raw = RawDump::from(
            r#"{"configs":[{"@type":"type.googleapis.com/envoy.admin.v3.ClustersConfigDump",
                "static_clusters":[{"cluster":{"type":"STATIC"}}]}]}"#,
        );
        assert!(matches!(
            decode(&raw, ResourceKind::Cluster),
            Err(InspectError::MalformedDump { .. })
        ));
    }

    #[test]
    fn listener_without_any_address_form_is_malformed() {
        let raw = RawDump::from(
            r#"{"configs":[{"@type":"type.googleapis.com/envoy.admin.v3.ListenersConfigDump",
                "static_listeners":[{"listener":{"name":"x","address":{}}}]}]}"#,
        );
        assert!(matches!(
            decode(&raw, ResourceKind::Listener),
            Err(InspectError::MalformedDump { .. })
        ));
    }

    #[test]
    fn non_object_payloads_are_malformed() {
        for body in ["[]", "\"text\"", "not json", ""] {
            for kind in ResourceKind::ALL {
                assert!(matches!(
                    decode(&RawDump::from(body), kind),
                    Err(InspectError::MalformedDump { .. })
                ));
            }
        }
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let raw = RawDump::from(
            r#"{"future_field":1,"configs":[{"@type":"type.googleapis.com/envoy.admin.v3.ListenersConfigDump",
                "version_info":"x","static_listeners":[{"listener":{"name":"l","shiny":true,
                "address":{"socket_address":{"address":"0.0.0.0","port_value":80,"protocol":"TCP"}}}}]}]}"#,
        );
        let entries = listeners(decode(&raw, ResourceKind::Listener).unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].direction, TrafficDirection::Unspecified);
    }

    #[test]
    fn decoding_is_deterministic() {
        for kind in [ResourceKind::Listener, ResourceKind::Route, ResourceKind::Cluster] {
            let raw = RawDump::from(CONFIG_DUMP);
            assert_eq!(decode(&raw, kind).unwrap(), decode(&raw, kind).unwrap());
        }
        let raw = RawDump::from(CLUSTERS_DUMP);
        assert_eq!(
            decode(&raw, ResourceKind::Endpoint).unwrap(),
            decode(&raw, ResourceKind::Endpoint).unwrap()
        );
    }

    #[test]
    fn snapshot_decodes_all_present_kinds() {
        let decoded = decode_snapshot(&RawDump::from(CONFIG_DUMP_EDS));
        assert!(decoded.failures.is_empty());
        assert_eq!(decoded.snapshot.listeners.len(), 1);
        assert_eq!(decoded.snapshot.endpoints.len(), 2);

        let decoded = decode_snapshot(&RawDump::from(CONFIG_DUMP));
        assert!(decoded.failures.is_empty());
        assert_eq!(decoded.snapshot.listeners.len(), 3);
        assert!(decoded.snapshot.endpoints.is_empty());
    }

    #[test]
    fn snapshot_of_garbage_fails_every_kind() {
        let decoded = decode_snapshot(&RawDump::from("[]"));
        assert_eq!(decoded.snapshot, ConfigSnapshot::default());
        let kinds: Vec<ResourceKind> = decoded.failures.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
        assert!(matches!(
            &decoded.failures[1].1,
            InspectError::MalformedDump { kind, .. } if kind == "route"
        ));
    }

    #[test]
    fn snapshot_keeps_other_kinds_when_one_fails() {
        let raw = RawDump::from(
            r#"{"configs":[
                {"@type":"type.googleapis.com/envoy.admin.v3.ListenersConfigDump",
                 "static_listeners":[{"listener":{"name":"l","address":{"socket_address":{"address":"0.0.0.0","port_value":80}}}}]},
                {"@type":"type.googleapis.com/envoy.admin.v3.ClustersConfigDump",
                 "static_clusters":[{"cluster":{}}]}]}"#,
        );
        let decoded = decode_snapshot(&raw);
        assert_eq!(decoded.snapshot.listeners.len(), 1);
        assert!(decoded.snapshot.clusters.is_empty());
        assert_eq!(decoded.failures.len(), 1);
        assert_eq!(decoded.failures[0].0, ResourceKind::Cluster);
    }
}
