use comfy_table::{presets::NOTHING, Table};

use crate::domain::proxy_config::model::{
    ClusterEntry, ConfigFragment, EndpointEntry, ListenerEntry, RouteEntry,
};
use crate::errors::InspectError;

const NONE: &str = "-";

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(header.to_vec());
    table
}

/// One line per entry with the identifying fields of its kind.
pub(super) fn summary(fragment: &ConfigFragment) -> Result<String, InspectError> {
    let table = match fragment {
        ConfigFragment::Listeners(entries) => listeners(entries),
        ConfigFragment::Routes(entries) => routes(entries),
        ConfigFragment::Clusters(entries) => clusters(entries),
        ConfigFragment::Endpoints(entries) => endpoints(entries),
    };
    Ok(table.to_string())
}

/// Every virtual host and route rule, one line per rule.
pub(super) fn route_detail(fragment: &ConfigFragment) -> Result<String, InspectError> {
    let ConfigFragment::Routes(entries) = fragment else {
        return Err(InspectError::unsupported_format(fragment.kind(), "detailed"));
    };

    let mut table = table(&["NAME", "VHOST NAME", "DOMAINS", "RULE", "MATCH", "DESTINATION"]);
    for route in entries {
        if route.virtual_hosts.is_empty() {
            table.add_row(vec![route.name.as_str(), NONE, NONE, NONE, NONE, NONE]);
            continue;
        }
        for vhost in &route.virtual_hosts {
            let domains = if vhost.domains.is_empty() {
                NONE.to_string()
            } else {
                vhost.domains.join(",")
            };
            if vhost.routes.is_empty() {
                table.add_row(vec![
                    route.name.clone(),
                    vhost.name.clone(),
                    domains,
                    NONE.to_string(),
                    NONE.to_string(),
                    NONE.to_string(),
                ]);
                continue;
            }
            for rule in &vhost.routes {
                table.add_row(vec![
                    route.name.clone(),
                    vhost.name.clone(),
                    domains.clone(),
                    rule.name.clone().unwrap_or_else(|| NONE.to_string()),
                    rule.match_rule.clone(),
                    rule.destination.clone(),
                ]);
            }
        }
    }
    Ok(table.to_string())
}

fn listeners(entries: &[ListenerEntry]) -> Table {
    let mut table = table(&["NAME", "ADDRESS", "PORT", "DIRECTION"]);
    for l in entries {
        table.add_row(vec![
            l.name.clone(),
            l.address.clone(),
            l.port.to_string(),
            l.direction.to_string(),
        ]);
    }
    table
}

fn routes(entries: &[RouteEntry]) -> Table {
    let mut table = table(&["NAME", "VIRTUAL HOSTS"]);
    for r in entries {
        table.add_row(vec![r.name.clone(), r.virtual_hosts.len().to_string()]);
    }
    table
}

fn clusters(entries: &[ClusterEntry]) -> Table {
    let mut table = table(&["SERVICE FQDN", "PORT", "SUBSET", "DIRECTION", "TYPE"]);
    for c in entries {
        table.add_row(vec![
            if c.fqdn.is_empty() { NONE.to_string() } else { c.fqdn.clone() },
            c.port.map_or_else(|| NONE.to_string(), |p| p.to_string()),
            c.subset.clone().unwrap_or_else(|| NONE.to_string()),
            c.direction.to_string(),
            c.discovery_type.clone(),
        ]);
    }
    table
}

fn endpoints(entries: &[EndpointEntry]) -> Table {
    let mut table = table(&["ENDPOINT", "STATUS", "OUTLIER CHECK", "CLUSTER"]);
    for e in entries {
        table.add_row(vec![
            format!("{}:{}", e.address, e.port),
            e.status.to_string(),
            if e.failed_outlier_check { "FAILED" } else { "OK" }.to_string(),
            e.cluster.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proxy_config::decoder::{decode, RawDump};
    use crate::domain::proxy_config::model::ResourceKind;

    const CONFIG_DUMP: &str = include_str!("../testdata/config_dump.json");
    const CLUSTERS_DUMP: &str = include_str!("../testdata/clusters.json");

    fn lines(body: &str) -> Vec<&str> {
        body.lines().filter(|l| !l.trim().is_empty()).collect()
    }

    #[test]
    fn empty_summary_is_header_only() {
        let body = summary(&ConfigFragment::Listeners(Vec::new())).unwrap();
        let rows = lines(&body);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("ADDRESS"));
        assert!(rows[0].contains("DIRECTION"));
    }

    #[test]
    fn listener_summary_has_one_line_per_entry() {
        let fragment = decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Listener).unwrap();
        let body = summary(&fragment).unwrap();
        let rows = lines(&body);
        assert_eq!(rows.len(), 4);
        assert!(rows[1].contains("15090"));
        assert!(rows[3].contains("10.0.0.12") && rows[3].contains("inbound"));
    }

    #[test]
    fn route_summary_lists_config_names_only() {
        let fragment = decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Route).unwrap();
        let body = summary(&fragment).unwrap();
        assert_eq!(lines(&body).len(), 4);
        assert!(body.contains("http.80"));
        assert!(!body.contains("reviews.default.svc.cluster.local:9080"));
    }

    #[test]
    fn route_detail_enumerates_every_rule() {
        let fragment = decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Route).unwrap();
        let body = route_detail(&fragment).unwrap();
        let rows = lines(&body);
        // header + 1 passthrough rule + 3 rules in 9080 + 3 rules and one empty vhost in http.80
        assert_eq!(rows.len(), 9);
        assert!(body.contains("reviews.default.svc.cluster.local:9080"));
        assert!(body.contains("block_all"));
        assert!(body.contains("regex:^/static/.*"));
        assert!(body.contains("cluster_header:x-target-cluster"));
        assert!(rows.iter().any(|r| r.contains("allow_any")));
    }

    #[test]
    fn cluster_summary_shows_placeholders() {
        let fragment = decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Cluster).unwrap();
        let body = summary(&fragment).unwrap();
        let rows = lines(&body);
        let blackhole = rows.iter().find(|r| r.contains("BlackHoleCluster")).unwrap();
        assert!(blackhole.contains(" - "));
        assert!(blackhole.contains("unspecified"));
        assert!(rows.iter().any(|r| r.contains("v1") && r.contains("9080") && r.contains("EDS")));
    }

    #[test]
    fn endpoint_summary_shows_status_and_outlier() {
        let fragment = decode(&RawDump::from(CLUSTERS_DUMP), ResourceKind::Endpoint).unwrap();
        let body = summary(&fragment).unwrap();
        let rows = lines(&body);
        assert_eq!(rows.len(), 4);
        assert!(rows[1].contains("10.0.1.5:9080") && rows[1].contains("HEALTHY"));
        assert!(rows[2].contains("UNHEALTHY") && rows[2].contains("FAILED"));
    }

    #[test]
    fn summary_is_deterministic() {
        let fragment = decode(&RawDump::from(CONFIG_DUMP), ResourceKind::Cluster).unwrap();
        assert_eq!(summary(&fragment).unwrap(), summary(&fragment).unwrap());
    }
}
