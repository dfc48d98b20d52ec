//! Defines the endpoint for deleting several financial records at once.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    record::{RecordId, core::delete_records},
};

/// The state needed to delete records.
#[derive(Debug, Clone)]
pub struct DeleteMultipleRecordsState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteMultipleRecordsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body listing the records to delete.
#[derive(Debug, Deserialize)]
pub struct DeleteMultipleRequest {
    /// The ids of the records to delete.
    pub ids: Vec<RecordId>,
}

/// A route handler for deleting every record listed in the request body.
///
/// Ids that do not belong to a record are ignored. Responds with `204 No Content`.
pub async fn delete_multiple_records_endpoint(
    State(state): State<DeleteMultipleRecordsState>,
    request: Result<Json<DeleteMultipleRequest>, JsonRejection>,
) -> Result<StatusCode, Error> {
    let Json(request) = request?;
    let connection = lock_connection(&state.db_connection)?;

    let rows_affected = delete_records(&request.ids, &connection).inspect_err(|error| {
        tracing::error!("Could not delete records {:?}: {error}", request.ids);
    })?;

    tracing::info!(
        requested = request.ids.len(),
        deleted = rows_affected,
        "Deleted financial records"
    );

    Ok(StatusCode::NO_CONTENT)
}
