use std::io::Write;

use async_trait::async_trait;

use crate::core::client::pods::PodIdentity;
use crate::domain::proxy_config::RenderedOutput;
use crate::errors::InspectError;

/// Where rendered outputs go once a pod's pipeline has succeeded.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn emit(&self, pod: &PodIdentity, output: &RenderedOutput) -> Result<(), InspectError>;
}

/// Writes each output to stdout under a one-line header naming the pod.
#[derive(Debug, Default)]
pub struct StdoutSink;

pub fn format_block(pod: &PodIdentity, output: &RenderedOutput) -> String {
    let mut block = format!("# {pod} {}/{}\n{}", output.kind, output.format, output.body);
    if !block.ends_with('\n') {
        block.push('\n');
    }
    block
}

#[async_trait]
impl OutputSink for StdoutSink {
    async fn emit(&self, pod: &PodIdentity, output: &RenderedOutput) -> Result<(), InspectError> {
        let block = format_block(pod, output);
        // one locked write per block so concurrent pods do not interleave
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(block.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| InspectError::transport("stdout", e.to_string()))
    }
}
