use crate::domain::proxy_config::model::ConfigFragment;
use crate::errors::InspectError;

pub(super) fn json(fragment: &ConfigFragment) -> Result<String, InspectError> {
    serde_json::to_string_pretty(fragment)
        .map_err(|e| InspectError::render(fragment.kind(), "json", e.to_string()))
}

pub(super) fn yaml(fragment: &ConfigFragment) -> Result<String, InspectError> {
    serde_yaml::to_string(fragment)
        .map_err(|e| InspectError::render(fragment.kind(), "yaml", e.to_string()))
}
