//! Sidecar proxy configuration: model, decoding, filtering and rendering

pub mod cluster_name;
pub mod decoder;
pub mod filter;
pub mod model;
pub mod render;
mod wire;

pub use decoder::{decode, decode_snapshot, RawDump};
pub use filter::{apply, CriteriaFields, FilterCriteria};
pub use model::ResourceKind;
pub use render::{render, render_token, OutputFormat, RenderedOutput};
