// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in users.

use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::WrappedSnapshot;
use crate::time_utils::{format_snapshot_date, parse_snapshot_date};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// API routes (require a session).
/// The session middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wrapped", get(list_wrapped))
        .route("/api/wrapped/{date}", get(get_wrapped))
}

/// Snapshot dates response.
#[derive(Serialize)]
pub struct WrappedDatesResponse {
    /// `YYYY-MM-DD`, newest first
    pub dates: Vec<String>,
}

/// List the dates of the current user's snapshots.
async fn list_wrapped(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<WrappedDatesResponse>> {
    let dates = state
        .store
        .list_snapshot_dates(&session.user_id)?
        .into_iter()
        .map(format_snapshot_date)
        .collect();

    Ok(Json(WrappedDatesResponse { dates }))
}

/// Get one of the current user's snapshots.
async fn get_wrapped(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(date): Path<String>,
) -> Result<Json<WrappedSnapshot>> {
    let date = parse_snapshot_date(&date)
        .map_err(|_| AppError::BadRequest(format!("invalid date {:?}, expected YYYY-MM-DD", date)))?;

    match state.store.get_snapshot(&session.user_id, date) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(AppError::Integrity) => Err(AppError::Database(
            "stored snapshot failed integrity check".to_string(),
        )),
        Err(e) => Err(e),
    }
}
