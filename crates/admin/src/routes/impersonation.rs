//! Impersonation handlers: start/stop, cart edits, and the banner status
//! endpoint.
//!
//! Cart edits walk the tracker through `Saving -> Saved` on success and
//! `Saving -> Error` on failure. The handler reports the edit outcome in its
//! HTTP status while the banner keeps polling `status` for the transient
//! state.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use heartwood_core::{AdminUserId, CustomerId, LineItemId};

use crate::db::carts::AdminCartView;
use crate::db::{CartRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::impersonation::{ImpersonationSession, SaveStatusSnapshot};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartImpersonationRequest {
    pub admin_id: AdminUserId,
    pub customer_id: CustomerId,
}

#[derive(Debug, Deserialize)]
pub struct StopImpersonationRequest {
    pub admin_id: AdminUserId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub line_id: LineItemId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveLineRequest {
    pub line_id: LineItemId,
}

fn active_session(state: &AppState, admin: AdminUserId) -> Result<ImpersonationSession> {
    state
        .impersonation()
        .session_for(admin)
        .ok_or_else(|| AppError::NotFound(format!("no active impersonation for admin {admin}")))
}

/// Begin impersonating a customer.
#[allow(clippy::unused_async)] // axum handlers must be async
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartImpersonationRequest>,
) -> Json<SaveStatusSnapshot> {
    let tracker = state
        .impersonation()
        .start(request.admin_id, request.customer_id);
    tracing::info!(
        admin = request.admin_id.as_i32(),
        customer = request.customer_id.as_i32(),
        "Impersonation started"
    );
    Json(tracker.snapshot())
}

/// End the admin's active impersonation.
#[allow(clippy::unused_async)]
pub async fn stop(
    State(state): State<AppState>,
    Json(request): Json<StopImpersonationRequest>,
) -> Result<Json<serde_json::Value>> {
    if !state.impersonation().stop(request.admin_id) {
        return Err(AppError::NotFound(format!(
            "no active impersonation for admin {}",
            request.admin_id
        )));
    }
    tracing::info!(admin = request.admin_id.as_i32(), "Impersonation stopped");
    Ok(Json(serde_json::json!({ "stopped": true })))
}

/// Banner state for the admin's active impersonation.
#[allow(clippy::unused_async)]
pub async fn status(
    State(state): State<AppState>,
    Path(admin_id): Path<AdminUserId>,
) -> Result<Json<SaveStatusSnapshot>> {
    let session = active_session(&state, admin_id)?;
    Ok(Json(session.tracker.snapshot()))
}

/// The impersonated customer's cart.
pub async fn cart(
    State(state): State<AppState>,
    Path(admin_id): Path<AdminUserId>,
) -> Result<Json<Option<AdminCartView>>> {
    let session = active_session(&state, admin_id)?;
    let view = CartRepository::new(state.pool())
        .cart_for_customer(session.customer)
        .await?;
    Ok(Json(view))
}

/// Record pending form edits that have not been persisted yet.
#[allow(clippy::unused_async)]
pub async fn mark_dirty(
    State(state): State<AppState>,
    Path(admin_id): Path<AdminUserId>,
) -> Result<Json<SaveStatusSnapshot>> {
    let session = active_session(&state, admin_id)?;
    session.tracker.mark_as_unsaved();
    Ok(Json(session.tracker.snapshot()))
}

/// Change a line's quantity in the impersonated customer's cart.
pub async fn update_line(
    State(state): State<AppState>,
    Path(admin_id): Path<AdminUserId>,
    Json(request): Json<UpdateLineRequest>,
) -> Result<Json<SaveStatusSnapshot>> {
    if request.quantity == 0 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1; use remove instead".to_string(),
        ));
    }

    let session = active_session(&state, admin_id)?;
    session.tracker.mark_as_saving();

    let outcome = CartRepository::new(state.pool())
        .update_line_quantity(session.customer, request.line_id, request.quantity)
        .await;

    finish_edit(&session, outcome)?;
    Ok(Json(session.tracker.snapshot()))
}

/// Remove a line from the impersonated customer's cart.
pub async fn remove_line(
    State(state): State<AppState>,
    Path(admin_id): Path<AdminUserId>,
    Json(request): Json<RemoveLineRequest>,
) -> Result<Json<SaveStatusSnapshot>> {
    let session = active_session(&state, admin_id)?;
    session.tracker.mark_as_saving();

    let outcome = CartRepository::new(state.pool())
        .remove_line(session.customer, request.line_id)
        .await;

    finish_edit(&session, outcome)?;
    Ok(Json(session.tracker.snapshot()))
}

/// Settle the tracker after a persistence attempt.
///
/// A missing line is a stale form, not a save failure: the tracker goes
/// back to `Idle` with the unsaved flag set instead of showing the error
/// banner.
fn finish_edit(
    session: &ImpersonationSession,
    outcome: std::result::Result<(), RepositoryError>,
) -> Result<()> {
    match outcome {
        Ok(()) => {
            session.tracker.mark_as_saved();
            Ok(())
        }
        Err(RepositoryError::NotFound) => {
            session.tracker.mark_as_unsaved();
            Err(AppError::from(RepositoryError::NotFound))
        }
        Err(error) => {
            session.tracker.mark_as_error();
            Err(AppError::from(error))
        }
    }
}
