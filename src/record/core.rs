use rusqlite::{Connection, Row, params};
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId};

pub type RecordId = DatabaseId;

/// The client-supplied values of a record, keyed by field name.
pub type RecordFields = Map<String, Value>;

/// A financial record as stored in the database and returned to clients.
///
/// Serializes to a single flat JSON object, with the schema fields next to `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    /// The id for the record, assigned by the database.
    pub id: RecordId,
    /// The values for the fields in the record schema.
    #[serde(flatten)]
    pub fields: RecordFields,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS financial_record (
            id INTEGER PRIMARY KEY,
            fields TEXT NOT NULL CHECK (json_valid(fields) AND json_type(fields) = 'object'),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// The current UTC time, truncated to whole seconds.
fn timestamp_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}

const SELECT_RECORD: &str = "SELECT id, fields, created_at, updated_at FROM financial_record";

/// Map a row of `id, fields, created_at, updated_at` to a record.
pub fn map_row_to_record(row: &Row) -> Result<FinancialRecord, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_fields: String = row.get(1)?;
    let created_at = row.get(2)?;
    let updated_at = row.get(3)?;

    let fields = serde_json::from_str(&raw_fields).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(FinancialRecord {
        id,
        fields,
        created_at,
        updated_at,
    })
}

/// Get every record, oldest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_records(connection: &Connection) -> Result<Vec<FinancialRecord>, Error> {
    connection
        .prepare(&format!("{SELECT_RECORD} ORDER BY id ASC"))?
        .query_map([], map_row_to_record)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Get the record with the given `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no record with that `id`.
pub fn get_record(id: RecordId, connection: &Connection) -> Result<FinancialRecord, Error> {
    connection
        .query_row(
            &format!("{SELECT_RECORD} WHERE id = ?1"),
            params![id],
            map_row_to_record,
        )
        .map_err(Error::from)
}

/// Insert a new record holding `fields`.
///
/// The caller should validate `fields` against the record schema first.
///
/// # Errors
/// Returns [Error::ConstraintViolation] if the database rejects the record.
pub fn insert_record(fields: RecordFields, connection: &Connection) -> Result<FinancialRecord, Error> {
    let now = timestamp_now();
    let raw_fields = serde_json::to_string(&fields)?;

    connection.execute(
        "INSERT INTO financial_record (fields, created_at, updated_at) VALUES (?1, ?2, ?3)",
        params![raw_fields, now, now],
    )?;

    Ok(FinancialRecord {
        id: connection.last_insert_rowid(),
        fields,
        created_at: now,
        updated_at: now,
    })
}

/// Overwrite the supplied `changes` on the record with the given `id`.
///
/// Fields not named in `changes` keep their stored values.
///
/// # Errors
/// Returns [Error::NotFound] if there is no record with that `id`, in which
/// case nothing is written.
pub fn update_record(
    id: RecordId,
    changes: RecordFields,
    connection: &Connection,
) -> Result<FinancialRecord, Error> {
    let transaction = connection.unchecked_transaction()?;

    let mut record = get_record(id, &transaction)?;
    record.fields.extend(changes);
    record.updated_at = timestamp_now();

    transaction.execute(
        "UPDATE financial_record SET fields = ?1, updated_at = ?2 WHERE id = ?3",
        params![serde_json::to_string(&record.fields)?, record.updated_at, id],
    )?;

    transaction.commit()?;

    Ok(record)
}

type RowsAffected = usize;

/// Delete the record with the given `id`, if it exists.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails. A missing record is not an error.
pub fn delete_record(id: RecordId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM financial_record WHERE id = ?1", params![id])
        .map_err(Error::from)
}

/// Delete every record whose id is in `ids`, ignoring ids that do not exist.
///
/// The deletes happen in a single transaction.
///
/// # Errors
/// Returns [Error::SqlError] if any delete fails, in which case none are applied.
pub fn delete_records(ids: &[RecordId], connection: &Connection) -> Result<RowsAffected, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut rows_affected = 0;

    {
        let mut statement = transaction.prepare("DELETE FROM financial_record WHERE id = ?1")?;

        for id in ids {
            rows_affected += statement.execute(params![id])?;
        }
    }

    transaction.commit()?;

    Ok(rows_affected)
}
