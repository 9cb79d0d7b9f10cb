//! Rendering of filtered fragments.
//!
//! Each supported `(kind, format)` pair is listed in [`RENDERERS`]; a pair
//! missing from the table is rejected with `UnsupportedFormat` instead of
//! falling back to another renderer. Renderers return the body; writing it
//! anywhere is the caller's business.

mod structured;
mod summary;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::proxy_config::model::{ConfigFragment, ResourceKind};
use crate::errors::InspectError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Detailed,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Summary => "summary",
            OutputFormat::Detailed => "detailed",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Summary | OutputFormat::Detailed => "text/plain; charset=utf-8",
            OutputFormat::Json => "application/json",
            OutputFormat::Yaml => "application/yaml",
        }
    }

    /// Parse a format token for `kind`. Tokens are matched exactly, and a
    /// known token the kind has no renderer for is rejected as well.
    pub fn parse_for(kind: ResourceKind, token: &str) -> Result<Self, InspectError> {
        let format: OutputFormat = token
            .parse()
            .map_err(|_| InspectError::unsupported_format(kind, token))?;
        if renderer(kind, format).is_none() {
            return Err(InspectError::unsupported_format(kind, token));
        }
        Ok(format)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(OutputFormat::Summary),
            "detailed" => Ok(OutputFormat::Detailed),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(InspectError::unsupported_format("any resource", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub kind: ResourceKind,
    pub format: OutputFormat,
    pub body: String,
}

impl RenderedOutput {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

type RenderFn = fn(&ConfigFragment) -> Result<String, InspectError>;

const RENDERERS: &[(ResourceKind, OutputFormat, RenderFn)] = &[
    (ResourceKind::Listener, OutputFormat::Summary, summary::summary),
    (ResourceKind::Listener, OutputFormat::Json, structured::json),
    (ResourceKind::Listener, OutputFormat::Yaml, structured::yaml),
    (ResourceKind::Route, OutputFormat::Summary, summary::summary),
    (ResourceKind::Route, OutputFormat::Detailed, summary::route_detail),
    (ResourceKind::Route, OutputFormat::Json, structured::json),
    (ResourceKind::Route, OutputFormat::Yaml, structured::yaml),
    (ResourceKind::Cluster, OutputFormat::Summary, summary::summary),
    (ResourceKind::Cluster, OutputFormat::Json, structured::json),
    (ResourceKind::Cluster, OutputFormat::Yaml, structured::yaml),
    (ResourceKind::Endpoint, OutputFormat::Summary, summary::summary),
    (ResourceKind::Endpoint, OutputFormat::Json, structured::json),
    (ResourceKind::Endpoint, OutputFormat::Yaml, structured::yaml),
];

fn renderer(kind: ResourceKind, format: OutputFormat) -> Option<RenderFn> {
    RENDERERS
        .iter()
        .find(|(k, f, _)| *k == kind && *f == format)
        .map(|(_, _, render)| *render)
}

/// Render a fragment in `format`.
pub fn render(fragment: &ConfigFragment, format: OutputFormat) -> Result<RenderedOutput, InspectError> {
    let kind = fragment.kind();
    let render = renderer(kind, format)
        .ok_or_else(|| InspectError::unsupported_format(kind, format.as_str()))?;

    Ok(RenderedOutput {
        kind,
        format,
        body: render(fragment)?,
    })
}

/// Render a fragment for a raw format token.
pub fn render_token(fragment: &ConfigFragment, token: &str) -> Result<RenderedOutput, InspectError> {
    let format = OutputFormat::parse_for(fragment.kind(), token)?;
    render(fragment, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proxy_config::decoder::{decode, RawDump};
    use crate::domain::proxy_config::model::{
        ClusterEntry, EndpointEntry, ListenerEntry, RouteEntry, TrafficDirection,
    };

    const CONFIG_DUMP: &str = include_str!("../testdata/config_dump.json");
    const CLUSTERS_DUMP: &str = include_str!("../testdata/clusters.json");

    fn fragment(kind: ResourceKind) -> ConfigFragment {
        let raw = match kind {
            ResourceKind::Endpoint => RawDump::from(CLUSTERS_DUMP),
            _ => RawDump::from(CONFIG_DUMP),
        };
        decode(&raw, kind).unwrap()
    }

    #[test]
    fn detailed_is_routes_only() {
        for kind in [ResourceKind::Listener, ResourceKind::Cluster, ResourceKind::Endpoint] {
            let err = render(&fragment(kind), OutputFormat::Detailed).unwrap_err();
            assert!(matches!(err, InspectError::UnsupportedFormat { .. }));
        }
        assert!(render(&fragment(ResourceKind::Route), OutputFormat::Detailed).is_ok());
    }

    #[test]
    fn unknown_tokens_are_unsupported_format() {
        for kind in ResourceKind::ALL {
            for token in ["table", "JSON", "", "yml", " summary"] {
                let err = render_token(&fragment(kind), token).unwrap_err();
                assert!(
                    matches!(err, InspectError::UnsupportedFormat { ref format, .. } if format == token),
                    "{kind}/{token:?}: {err}"
                );
            }
        }
    }

    #[test]
    fn listener_rejects_detailed_token() {
        let err = render_token(&fragment(ResourceKind::Listener), "detailed").unwrap_err();
        assert_eq!(
            err,
            InspectError::unsupported_format(ResourceKind::Listener, "detailed")
        );
    }

    #[test]
    fn json_round_trips_every_kind() {
        let ConfigFragment::Listeners(listeners) = fragment(ResourceKind::Listener) else {
            panic!()
        };
        let out = render(&ConfigFragment::Listeners(listeners.clone()), OutputFormat::Json).unwrap();
        assert_eq!(out.content_type(), "application/json");
        let back: Vec<ListenerEntry> = serde_json::from_str(&out.body).unwrap();
        assert_eq!(back, listeners);

        let ConfigFragment::Routes(routes) = fragment(ResourceKind::Route) else { panic!() };
        let out = render(&ConfigFragment::Routes(routes.clone()), OutputFormat::Json).unwrap();
        let back: Vec<RouteEntry> = serde_json::from_str(&out.body).unwrap();
        assert_eq!(back, routes);

        let ConfigFragment::Clusters(clusters) = fragment(ResourceKind::Cluster) else { panic!() };
        let out = render(&ConfigFragment::Clusters(clusters.clone()), OutputFormat::Json).unwrap();
        let back: Vec<ClusterEntry> = serde_json::from_str(&out.body).unwrap();
        assert_eq!(back, clusters);

        let ConfigFragment::Endpoints(endpoints) = fragment(ResourceKind::Endpoint) else {
            panic!()
        };
        let out = render(&ConfigFragment::Endpoints(endpoints.clone()), OutputFormat::Json).unwrap();
        let back: Vec<EndpointEntry> = serde_json::from_str(&out.body).unwrap();
        assert_eq!(back, endpoints);
    }

    #[test]
    fn yaml_round_trips_every_kind() {
        let ConfigFragment::Listeners(listeners) = fragment(ResourceKind::Listener) else {
            panic!()
        };
        assert_eq!(listeners[0].direction, TrafficDirection::Unspecified);
        let out = render(&ConfigFragment::Listeners(listeners.clone()), OutputFormat::Yaml).unwrap();
        assert_eq!(out.content_type(), "application/yaml");
        assert!(out.body.contains("direction: UNSPECIFIED"));
        let back: Vec<ListenerEntry> = serde_yaml::from_str(&out.body).unwrap();
        assert_eq!(back, listeners);

        let ConfigFragment::Routes(routes) = fragment(ResourceKind::Route) else { panic!() };
        let out = render(&ConfigFragment::Routes(routes.clone()), OutputFormat::Yaml).unwrap();
        let back: Vec<RouteEntry> = serde_yaml::from_str(&out.body).unwrap();
        assert_eq!(back, routes);

        let ConfigFragment::Clusters(clusters) = fragment(ResourceKind::Cluster) else { panic!() };
        let out = render(&ConfigFragment::Clusters(clusters.clone()), OutputFormat::Yaml).unwrap();
        let back: Vec<ClusterEntry> = serde_yaml::from_str(&out.body).unwrap();
        assert_eq!(back, clusters);

        let ConfigFragment::Endpoints(endpoints) = fragment(ResourceKind::Endpoint) else {
            panic!()
        };
        let out = render(&ConfigFragment::Endpoints(endpoints.clone()), OutputFormat::Yaml).unwrap();
        let back: Vec<EndpointEntry> = serde_yaml::from_str(&out.body).unwrap();
        assert_eq!(back, endpoints);
    }

    #[test]
    fn empty_fragments_render_without_error() {
        for format in [OutputFormat::Summary, OutputFormat::Json, OutputFormat::Yaml] {
            let out = render(&ConfigFragment::Clusters(Vec::new()), format).unwrap();
            assert!(!out.body.is_empty());
        }
        let out = render(&ConfigFragment::Listeners(Vec::new()), OutputFormat::Json).unwrap();
        assert_eq!(out.body.trim(), "[]");
    }

    #[test]
    fn rendering_does_not_touch_the_fragment() {
        let before = fragment(ResourceKind::Route);
        let copy = before.clone();
        for format in [OutputFormat::Summary, OutputFormat::Detailed, OutputFormat::Json] {
            render(&before, format).unwrap();
        }
        assert_eq!(before, copy);
    }
}
