use super::model::TrafficDirection;

/// Parts of a mesh cluster name such as `outbound|9080|v1|reviews.default.svc.cluster.local`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterName {
    pub direction: TrafficDirection,
    pub port: Option<u16>,
    pub subset: Option<String>,
    pub fqdn: String,
}

impl ClusterName {
    /// Split a `direction|port|subset|fqdn` name. Anything not in that shape
    /// (`BlackHoleCluster`, `prometheus_stats`, SNI-style names) keeps the
    /// whole name as fqdn with no port, subset or direction.
    pub fn parse(name: &str) -> Self {
        let parts: Vec<&str> = name.split('|').collect();
        if let [direction, port, subset, fqdn] = parts.as_slice() {
            let direction = match *direction {
                "inbound" => Some(TrafficDirection::Inbound),
                "outbound" => Some(TrafficDirection::Outbound),
                _ => None,
            };
            if let (Some(direction), Ok(port)) = (direction, port.parse::<u16>()) {
                return Self {
                    direction,
                    port: Some(port),
                    subset: (!subset.is_empty()).then(|| subset.to_string()),
                    fqdn: fqdn.to_string(),
                };
            }
        }

        Self {
            direction: TrafficDirection::Unspecified,
            port: None,
            subset: None,
            fqdn: name.to_string(),
        }
    }
}
