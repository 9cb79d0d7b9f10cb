//! Reconciliation state routes (e.g., /api/v1/states/*)

use axum::{routing::get, Router};
use crate::api::controller::state::StateController;
use crate::app_state::AppState;

pub fn state_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(StateController::get_all))
        .route("/{namespace}/{name}", get(StateController::get_resource))
}
