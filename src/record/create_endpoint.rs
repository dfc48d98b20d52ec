//! Defines the endpoint for creating a new financial record.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde_json::Value;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    record::{
        FinancialRecord, RecordSchema,
        core::insert_record,
        schema::PayloadMode,
    },
};

/// The state needed to create a record.
#[derive(Debug, Clone)]
pub struct CreateRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The fields a record may hold.
    pub schema: Arc<RecordSchema>,
}

impl FromRef<AppState> for CreateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            schema: state.record_schema.clone(),
        }
    }
}

/// A route handler for creating a new record from a JSON object of field values.
///
/// Responds with `201 Created` and the stored record, including its new `id`.
pub async fn create_record_endpoint(
    State(state): State<CreateRecordState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<FinancialRecord>), Error> {
    let Json(payload) = payload?;
    let fields = state.schema.validate(payload, PayloadMode::Create)?;

    let connection = lock_connection(&state.db_connection)?;
    let record = insert_record(fields, &connection).inspect_err(|error| {
        tracing::error!("Could not create financial record: {error}");
    })?;

    tracing::info!(record_id = record.id, "Created financial record");

    Ok((StatusCode::CREATED, Json(record)))
}
