//! Route definitions for the admin portal.

pub mod impersonation;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the admin router. Health endpoints are mounted in `main`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/impersonation/start", post(impersonation::start))
        .route("/impersonation/stop", post(impersonation::stop))
        .route("/impersonation/{admin_id}/status", get(impersonation::status))
        .route("/impersonation/{admin_id}/cart", get(impersonation::cart))
        .route(
            "/impersonation/{admin_id}/cart/dirty",
            post(impersonation::mark_dirty),
        )
        .route(
            "/impersonation/{admin_id}/cart/update",
            post(impersonation::update_line),
        )
        .route(
            "/impersonation/{admin_id}/cart/remove",
            post(impersonation::remove_line),
        )
}
