//! API route declarations (e.g., /api/v1/*)

pub mod inspect_routes;
pub mod state_routes;
