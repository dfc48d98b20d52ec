//! Defines the endpoint for deleting a financial record.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State, rejection::PathRejection},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    record::{RecordId, core::delete_record},
};

/// The state needed to delete a record.
#[derive(Debug, Clone)]
pub struct DeleteRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a record, responds with `204 No Content`.
///
/// Deleting a record that does not exist also succeeds, and so does an id
/// that is not an integer since no record can have it.
pub async fn delete_record_endpoint(
    State(state): State<DeleteRecordState>,
    record_id: Result<Path<RecordId>, PathRejection>,
) -> Result<StatusCode, Error> {
    let record_id = match record_id {
        Ok(Path(record_id)) => record_id,
        Err(rejection) => {
            tracing::debug!("No record can match the path: {}", rejection.body_text());
            return Ok(StatusCode::NO_CONTENT);
        }
    };

    let connection = lock_connection(&state.db_connection)?;

    match delete_record(record_id, &connection) {
        Ok(0) => tracing::debug!("Record {record_id} was already gone"),
        Ok(_) => tracing::info!(record_id, "Deleted financial record"),
        Err(error) => {
            tracing::error!("Could not delete record {record_id}: {error}");
            return Err(error);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        Error, initialize_db,
        record::{
            core::{get_record, insert_record},
            delete_endpoint::{DeleteRecordState, delete_record_endpoint},
        },
    };

    fn get_test_state() -> DeleteRecordState {
        let conn = Connection::open_in_memory().unwrap();
        initialize_db(&conn).unwrap();

        DeleteRecordState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn deletes_record() {
        let state = get_test_state();
        let record = insert_record(
            json!({"amount": 100}).as_object().cloned().unwrap(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let status = delete_record_endpoint(State(state.clone()), Ok(Path(record.id)))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            get_record(record.id, &state.db_connection.lock().unwrap()),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn deleting_twice_succeeds() {
        let state = get_test_state();
        let record = insert_record(
            json!({"amount": 100}).as_object().cloned().unwrap(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        for _ in 0..2 {
            let status = delete_record_endpoint(State(state.clone()), Ok(Path(record.id)))
                .await
                .unwrap();

            assert_eq!(status, StatusCode::NO_CONTENT);
        }
    }
}
