use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::crd::controlling_resource::ControllingResourceSource;
use crate::core::state::runtime::reconcile::ReconcileStateManager;
use crate::core::util::duration::format_duration;
use crate::errors::InspectError;
use crate::scheduler::tasks::reconcile::task::{execute_pass, PassContext};

/// Fixed-cadence reconciliation without a watch: read the controlling
/// resource, run one pass, sleep for its interval, repeat until cancelled.
pub struct ReconciliationLoop {
    ctx: PassContext,
    source: Arc<dyn ControllingResourceSource>,
    state: Arc<ReconcileStateManager>,
    key: String,
    fallback_interval: Duration,
}

impl ReconciliationLoop {
    pub fn new(
        ctx: PassContext,
        source: Arc<dyn ControllingResourceSource>,
        state: Arc<ReconcileStateManager>,
        key: impl Into<String>,
        fallback_interval: Duration,
    ) -> Self {
        Self {
            ctx,
            source,
            state,
            key: key.into(),
            fallback_interval,
        }
    }

    /// One tick. Returns how long to wait before the next one.
    pub async fn tick(&self, cancel: &CancellationToken) -> Duration {
        let resource = match self.source.read().await {
            Ok(resource) => resource,
            Err(e) => {
                match &e {
                    InspectError::NotFound(what) => {
                        info!(resource = %self.key, "{what} not found, skipping pass");
                    }
                    other => warn!(resource = %self.key, error = %other, "Cannot read controlling resource"),
                }
                self.state.skip_pass(&self.key, e.to_string()).await;
                return self.fallback_interval;
            }
        };

        // a skipped pass waits the same interval; execute_pass already logged it
        execute_pass(&self.ctx, &self.state, &resource, cancel).await;
        resource.requeue_interval
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(resource = %self.key, "Reconciliation loop started");
        while !cancel.is_cancelled() {
            let wait = self.tick(&cancel).await;
            debug!(resource = %self.key, "Next pass in {}", format_duration(wait));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!(resource = %self.key, "Reconciliation loop stopped");
    }
}
