//! Defines the endpoint for updating a financial record.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{
        FromRef, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use rusqlite::Connection;
use serde_json::Value;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    record::{
        FinancialRecord, RecordId, RecordSchema,
        core::update_record,
        schema::PayloadMode,
    },
};

/// The state needed to update a record.
#[derive(Debug, Clone)]
pub struct UpdateRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The fields a record may hold.
    pub schema: Arc<RecordSchema>,
}

impl FromRef<AppState> for UpdateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            schema: state.record_schema.clone(),
        }
    }
}

/// A route handler for changing some or all fields of an existing record.
///
/// Fields missing from the request body keep their current values.
/// Responds with `404 Not Found` if there is no record with the id in the path,
/// including when the id is not an integer.
pub async fn update_record_endpoint(
    State(state): State<UpdateRecordState>,
    record_id: Result<Path<RecordId>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FinancialRecord>, Error> {
    let Path(record_id) = record_id?;
    let Json(payload) = payload?;
    let changes = state.schema.validate(payload, PayloadMode::Update)?;

    let connection = lock_connection(&state.db_connection)?;
    let record = update_record(record_id, changes, &connection).inspect_err(|error| match error {
        Error::NotFound => tracing::debug!("Tried to update missing record {record_id}"),
        error => tracing::error!("Could not update record {record_id}: {error}"),
    })?;

    tracing::info!(record_id, "Updated financial record");

    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Path, State},
    };
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        Error, initialize_db,
        record::{
            RecordSchema,
            core::{get_record, insert_record, list_records},
            update_endpoint::{UpdateRecordState, update_record_endpoint},
        },
    };

    fn get_test_state() -> UpdateRecordState {
        let conn = Connection::open_in_memory().unwrap();
        initialize_db(&conn).unwrap();

        UpdateRecordState {
            db_connection: Arc::new(Mutex::new(conn)),
            schema: Arc::new(RecordSchema::default()),
        }
    }

    #[tokio::test]
    async fn updates_only_supplied_fields() {
        let state = get_test_state();
        let record = insert_record(
            json!({"amount": 100, "category": "rent"})
                .as_object()
                .cloned()
                .unwrap(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let Json(updated) = update_record_endpoint(
            State(state.clone()),
            Ok(Path(record.id)),
            Ok(Json(json!({"amount": 150}))),
        )
        .await
        .unwrap();

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.fields["amount"], json!(150));
        assert_eq!(updated.fields["category"], json!("rent"));
        assert_eq!(
            get_record(record.id, &state.db_connection.lock().unwrap()),
            Ok(updated)
        );
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let state = get_test_state();

        let result = update_record_endpoint(
            State(state.clone()),
            Ok(Path(999)),
            Ok(Json(json!({"amount": 1}))),
        )
        .await;

        assert_eq!(result.unwrap_err(), Error::NotFound);
        assert_eq!(list_records(&state.db_connection.lock().unwrap()), Ok(vec![]));
    }

    #[tokio::test]
    async fn rejects_wrong_kind() {
        let state = get_test_state();
        let record = insert_record(
            json!({"amount": 100}).as_object().cloned().unwrap(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let result = update_record_endpoint(
            State(state.clone()),
            Ok(Path(record.id)),
            Ok(Json(json!({"amount": "a lot"}))),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidPayload(_))));
        assert_eq!(
            get_record(record.id, &state.db_connection.lock().unwrap()),
            Ok(record)
        );
    }
}
