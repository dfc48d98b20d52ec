//! Defines the endpoint for listing every financial record.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    record::{
        FinancialRecord,
        core::list_records,
    },
};

/// The state needed to list records.
#[derive(Debug, Clone)]
pub struct ListRecordsState {
    /// The database connection for reading records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListRecordsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that responds with every record as a JSON array, oldest first.
pub async fn list_records_endpoint(
    State(state): State<ListRecordsState>,
) -> Result<Json<Vec<FinancialRecord>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let records = list_records(&connection).inspect_err(|error| {
        tracing::error!("Could not list financial records: {error}");
    })?;

    Ok(Json(records))
}
