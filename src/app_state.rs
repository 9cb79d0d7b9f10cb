use std::sync::Arc;

use crate::core::client::proxy_admin_client::ProxyAdminClient;
use crate::core::state::runtime::reconcile::ReconcileStateManager;
use crate::scheduler::retry::RetryPolicy;

#[derive(Clone)]
pub struct AppState {
    /// Same admin capability the reconciliation passes use.
    pub admin: Arc<dyn ProxyAdminClient>,
    pub reconcile_state: Arc<ReconcileStateManager>,
    pub retry: RetryPolicy,
}

pub fn build_app_state(
    admin: Arc<dyn ProxyAdminClient>,
    reconcile_state: Arc<ReconcileStateManager>,
    retry: RetryPolicy,
) -> AppState {
    AppState {
        admin,
        reconcile_state,
        retry,
    }
}
