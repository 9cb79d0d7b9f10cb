use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::domain::proxy_config::model::{
    ClusterEntry, ConfigFragment, EndpointEntry, ListenerEntry, ResourceKind, RouteEntry,
    TrafficDirection, VirtualHostEntry,
};
use crate::errors::InspectError;

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerFilter {
    pub address: Option<String>,
    pub port: Option<u16>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilter {
    /// Exact route config name.
    pub name: Option<String>,
    /// `Some(false)` collapses virtual hosts to their names.
    pub verbose: Option<bool>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterFilter {
    pub fqdn: Option<String>,
    pub port: Option<u16>,
    pub subset: Option<String>,
    pub direction: Option<TrafficDirection>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointFilter {
    pub address: Option<String>,
    pub port: Option<u16>,
}

/// Selection criteria scoped to one resource kind. Unset fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FilterCriteria {
    Listener(ListenerFilter),
    Route(RouteFilter),
    Cluster(ClusterFilter),
    Endpoint(EndpointFilter),
}

/// Loose, untyped criteria as they arrive from a query string or a resource spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaFields {
    pub name: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub fqdn: Option<String>,
    pub subset: Option<String>,
    pub direction: Option<String>,
    pub verbose: Option<bool>,
}

impl CriteriaFields {
    /// Names of the fields that are set, in declaration order.
    fn set_fields(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.name.is_some() {
            set.push("name");
        }
        if self.address.is_some() {
            set.push("address");
        }
        if self.port.is_some() {
            set.push("port");
        }
        if self.fqdn.is_some() {
            set.push("fqdn");
        }
        if self.subset.is_some() {
            set.push("subset");
        }
        if self.direction.is_some() {
            set.push("direction");
        }
        if self.verbose.is_some() {
            set.push("verbose");
        }
        set
    }

    /// Blank strings are treated as unset.
    fn normalized(&self) -> Self {
        fn non_blank(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        Self {
            name: non_blank(&self.name),
            address: non_blank(&self.address),
            port: self.port,
            fqdn: non_blank(&self.fqdn),
            subset: non_blank(&self.subset),
            direction: non_blank(&self.direction),
            verbose: self.verbose,
        }
    }
}

impl FilterCriteria {
    /// Criteria that match every entry of `kind`.
    pub fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Listener => FilterCriteria::Listener(ListenerFilter::default()),
            ResourceKind::Route => FilterCriteria::Route(RouteFilter::default()),
            ResourceKind::Cluster => FilterCriteria::Cluster(ClusterFilter::default()),
            ResourceKind::Endpoint => FilterCriteria::Endpoint(EndpointFilter::default()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            FilterCriteria::Listener(_) => ResourceKind::Listener,
            FilterCriteria::Route(_) => ResourceKind::Route,
            FilterCriteria::Cluster(_) => ResourceKind::Cluster,
            FilterCriteria::Endpoint(_) => ResourceKind::Endpoint,
        }
    }

    /// Build typed criteria for `kind`, rejecting fields the kind does not
    /// filter on and direction tokens that are not a known direction.
    pub fn from_fields(kind: ResourceKind, fields: &CriteriaFields) -> Result<Self, InspectError> {
        let fields = fields.normalized();
        let allowed: &[&str] = match kind {
            ResourceKind::Listener | ResourceKind::Endpoint => &["address", "port"],
            ResourceKind::Route => &["name", "verbose"],
            ResourceKind::Cluster => &["fqdn", "port", "subset", "direction"],
        };

        let foreign: Vec<&str> = fields
            .set_fields()
            .into_iter()
            .filter(|f| !allowed.contains(f))
            .collect();
        if !foreign.is_empty() {
            return Err(InspectError::invalid_criteria(format!(
                "{kind} cannot be filtered by {}; supported fields: {}",
                foreign.join(", "),
                allowed.join(", ")
            )));
        }

        let criteria = match kind {
            ResourceKind::Listener => FilterCriteria::Listener(ListenerFilter {
                address: fields.address,
                port: fields.port,
            }),
            ResourceKind::Route => FilterCriteria::Route(RouteFilter {
                name: fields.name,
                verbose: fields.verbose,
            }),
            ResourceKind::Cluster => FilterCriteria::Cluster(ClusterFilter {
                fqdn: fields.fqdn,
                port: fields.port,
                subset: fields.subset,
                direction: fields
                    .direction
                    .as_deref()
                    .map(str::parse::<TrafficDirection>)
                    .transpose()?,
            }),
            ResourceKind::Endpoint => FilterCriteria::Endpoint(EndpointFilter {
                address: fields.address,
                port: fields.port,
            }),
        };
        Ok(criteria)
    }
}

trait Matches<T> {
    fn matches(&self, entry: &T) -> bool;
}

fn field_matches<T: PartialEq + ?Sized>(wanted: Option<&T>, actual: &T) -> bool {
    wanted.map_or(true, |w| w == actual)
}

impl Matches<ListenerEntry> for ListenerFilter {
    fn matches(&self, entry: &ListenerEntry) -> bool {
        field_matches(self.address.as_deref(), entry.address.as_str())
            && field_matches(self.port.as_ref(), &entry.port)
    }
}

impl Matches<RouteEntry> for RouteFilter {
    fn matches(&self, entry: &RouteEntry) -> bool {
        field_matches(self.name.as_deref(), entry.name.as_str())
    }
}

impl Matches<ClusterEntry> for ClusterFilter {
    fn matches(&self, entry: &ClusterEntry) -> bool {
        field_matches(self.fqdn.as_deref(), entry.fqdn.as_str())
            && self.port.map_or(true, |p| entry.port == Some(p))
            && self
                .subset
                .as_deref()
                .map_or(true, |s| entry.subset.as_deref() == Some(s))
            && field_matches(self.direction.as_ref(), &entry.direction)
    }
}

impl Matches<EndpointEntry> for EndpointFilter {
    fn matches(&self, entry: &EndpointEntry) -> bool {
        field_matches(self.address.as_deref(), entry.address.as_str())
            && field_matches(self.port.as_ref(), &entry.port)
    }
}

fn retain<T, F: Matches<T>>(entries: Vec<T>, filter: &F) -> Vec<T> {
    entries.into_iter().filter(|e| filter.matches(e)).collect()
}

/// Narrow a fragment to the entries matching `criteria`, keeping decode order.
///
/// Criteria for a different kind than the fragment leave it untouched.
pub fn apply(fragment: ConfigFragment, criteria: &FilterCriteria) -> ConfigFragment {
    match (fragment, criteria) {
        (ConfigFragment::Listeners(entries), FilterCriteria::Listener(f)) => {
            ConfigFragment::Listeners(retain(entries, f))
        }
        (ConfigFragment::Routes(entries), FilterCriteria::Route(f)) => {
            let mut routes = retain(entries, f);
            if f.verbose == Some(false) {
                for route in &mut routes {
                    route.virtual_hosts = route
                        .virtual_hosts
                        .iter()
                        .map(|vh| VirtualHostEntry {
                            name: vh.name.clone(),
                            domains: Vec::new(),
                            routes: Vec::new(),
                        })
                        .collect();
                }
            }
            ConfigFragment::Routes(routes)
        }
        (ConfigFragment::Clusters(entries), FilterCriteria::Cluster(f)) => {
            ConfigFragment::Clusters(retain(entries, f))
        }
        (ConfigFragment::Endpoints(entries), FilterCriteria::Endpoint(f)) => {
            ConfigFragment::Endpoints(retain(entries, f))
        }
        (fragment, _) => fragment,
    }
}
