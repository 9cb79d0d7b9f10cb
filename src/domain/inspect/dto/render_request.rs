use serde::Serialize;

use crate::core::client::proxy_admin_client::AdminQuery;
use crate::domain::proxy_config::{CriteriaFields, FilterCriteria, OutputFormat, ResourceKind};
use crate::errors::InspectError;

/// What to fetch, how to narrow it and how to print it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderRequest {
    pub format: OutputFormat,
    pub criteria: FilterCriteria,
    /// Read endpoints from the EDS section of a full dump instead of `clusters`.
    pub include_eds: bool,
}

impl RenderRequest {
    /// Validate loose request fields for `kind`. Unknown format tokens, and
    /// formats the kind cannot be rendered in, fail with `UnsupportedFormat`.
    pub fn new(
        kind: ResourceKind,
        format: &str,
        fields: &CriteriaFields,
        include_eds: bool,
    ) -> Result<Self, InspectError> {
        Ok(Self {
            format: OutputFormat::parse_for(kind, format)?,
            criteria: FilterCriteria::from_fields(kind, fields)?,
            include_eds,
        })
    }

    /// The request run when a resource names no inspections.
    pub fn route_summary() -> Self {
        Self {
            format: OutputFormat::Summary,
            criteria: FilterCriteria::empty(ResourceKind::Route),
            include_eds: false,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.criteria.kind()
    }

    pub fn admin_query(&self) -> AdminQuery {
        match self.kind() {
            ResourceKind::Endpoint if !self.include_eds => AdminQuery::Clusters,
            _ => AdminQuery::ConfigDump {
                include_eds: self.include_eds,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selects_admin_query() {
        let fields = CriteriaFields::default();
        let listener = RenderRequest::new(ResourceKind::Listener, "json", &fields, false).unwrap();
        assert_eq!(listener.admin_query(), AdminQuery::ConfigDump { include_eds: false });

        let endpoint = RenderRequest::new(ResourceKind::Endpoint, "summary", &fields, false).unwrap();
        assert_eq!(endpoint.admin_query(), AdminQuery::Clusters);

        let eds = RenderRequest::new(ResourceKind::Endpoint, "summary", &fields, true).unwrap();
        assert_eq!(eds.admin_query().path(), "config_dump?include_eds=true");

        let route = RenderRequest::new(ResourceKind::Route, "detailed", &fields, true).unwrap();
        assert_eq!(route.admin_query().path(), "config_dump?include_eds=true");
    }

    #[test]
    fn default_request_is_route_summary() {
        let request = RenderRequest::route_summary();
        assert_eq!(request.kind(), ResourceKind::Route);
        assert_eq!(request.format, OutputFormat::Summary);
        assert_eq!(request.admin_query().path(), "config_dump");
    }

    #[test]
    fn rejects_detailed_listeners_and_bad_criteria() {
        let fields = CriteriaFields::default();
        assert!(matches!(
            RenderRequest::new(ResourceKind::Listener, "detailed", &fields, false),
            Err(InspectError::UnsupportedFormat { .. })
        ));

        let fields = CriteriaFields {
            name: Some("9080".into()),
            ..Default::default()
        };
        assert!(matches!(
            RenderRequest::new(ResourceKind::Cluster, "summary", &fields, false),
            Err(InspectError::InvalidCriteria(_))
        ));
    }
}
