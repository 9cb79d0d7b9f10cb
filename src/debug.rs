use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::client::pods::PodIdentity;
use crate::core::output::sink::{OutputSink, StdoutSink};
use crate::core::settings::DebugSettings;
use crate::domain::proxy_config::{
    decode, decode_snapshot, render_token, RawDump, RenderedOutput, ResourceKind,
};

/// Decode and render one dump file; no cluster access.
pub fn render_dump_file(settings: &DebugSettings) -> Result<Vec<RenderedOutput>> {
    let bytes = std::fs::read(&settings.dump)
        .with_context(|| format!("cannot read dump file {}", settings.dump.display()))?;
    let raw = RawDump::from(bytes);

    let Some(kind) = settings.kind else {
        return Ok(render_all(&raw, &settings.format));
    };
    let fragment = decode(&raw, kind)?;
    info!(kind = %kind, entries = fragment.len(), "Decoded dump file");
    Ok(vec![render_token(&fragment, &settings.format)?])
}

/// Every kind the dump carries; kinds that fail are logged and left out.
fn render_all(raw: &RawDump, format: &str) -> Vec<RenderedOutput> {
    let decoded = decode_snapshot(raw);
    for (kind, err) in &decoded.failures {
        warn!(kind = %kind, error = %err, "Cannot decode kind");
    }

    ResourceKind::ALL
        .iter()
        .filter(|kind| !decoded.failures.iter().any(|(failed, _)| failed == *kind))
        .filter_map(|kind| {
            let fragment = decoded.snapshot.fragment(*kind);
            match render_token(&fragment, format) {
                Ok(output) => Some(output),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Cannot render kind");
                    None
                }
            }
        })
        .collect()
}

/// Runs only when in CLUSTERMAID_DEBUG_MODE
pub async fn run_debug(settings: &DebugSettings) -> Result<()> {
    info!("🔧 Debug mode: rendering {}", settings.dump.display());

    let outputs = render_dump_file(settings)?;
    let source = PodIdentity::new("debug", settings.dump.display().to_string());
    let sink: Arc<dyn OutputSink> = Arc::new(StdoutSink);
    for output in &outputs {
        sink.emit(&source, output).await?;
    }

    info!("Debug render completed. Exiting...");
    Ok(())
}
