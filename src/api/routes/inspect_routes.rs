//! Inspect routes (e.g., /api/v1/inspect/*)

use axum::{routing::get, Router};
use crate::api::controller::inspect::InspectController;
use crate::app_state::AppState;

pub fn inspect_routes() -> Router<AppState> {
    Router::new()
        .route("/{namespace}/{pod}/{kind}", get(InspectController::inspect))
}
