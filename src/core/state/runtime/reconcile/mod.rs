pub mod reconcile_runtime_state;
pub mod reconcile_runtime_state_manager;
pub mod reconcile_runtime_state_repository;
pub mod reconcile_runtime_state_repository_trait;

use reconcile_runtime_state_manager::ReconcileRuntimeStateManager;
use reconcile_runtime_state_repository::ReconcileRuntimeStateRepository;

/// The state manager every task and controller shares.
pub type ReconcileStateManager = ReconcileRuntimeStateManager<ReconcileRuntimeStateRepository>;
