//! Inspect API DTOs

use serde::Deserialize;
use validator::Validate;

use crate::domain::proxy_config::CriteriaFields;

/// Query string of `GET /api/v1/inspect/{namespace}/{pod}/{kind}`.
///
/// Which filter fields apply depends on the kind; a field foreign to the
/// kind is rejected when the request is built.
#[derive(Deserialize, Debug, Default, Validate)]
pub struct InspectQuery {
    /// `summary`, `detailed`, `json` or `yaml`; `summary` when absent.
    #[validate(length(min = 1, max = 16))]
    pub format: Option<String>,

    #[validate(length(max = 253))]
    pub name: Option<String>,
    #[validate(length(max = 253))]
    pub address: Option<String>,
    pub port: Option<u16>,
    #[validate(length(max = 253))]
    pub fqdn: Option<String>,
    #[validate(length(max = 63))]
    pub subset: Option<String>,
    /// `inbound` or `outbound`
    pub direction: Option<String>,
    pub verbose: Option<bool>,

    /// Read endpoints from the full dump's EDS section.
    #[serde(default)]
    pub include_eds: bool,
}

impl InspectQuery {
    pub fn format_token(&self) -> &str {
        self.format.as_deref().unwrap_or("summary")
    }

    pub fn criteria_fields(&self) -> CriteriaFields {
        CriteriaFields {
            name: self.name.clone(),
            address: self.address.clone(),
            port: self.port,
            fqdn: self.fqdn.clone(),
            subset: self.subset.clone(),
            direction: self.direction.clone(),
            verbose: self.verbose,
        }
    }
}

/// Path of `GET /api/v1/states/{namespace}/{name}`.
#[derive(Deserialize, Debug)]
pub struct StateKeyPath {
    pub namespace: String,
    pub name: String,
}

impl StateKeyPath {
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}
