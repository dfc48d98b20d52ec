//! Creates the application's database tables.

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    Error, auth::create_personal_access_token_table, record::create_record_table,
    user::create_user_table,
};

/// Create all the tables the application needs, if they do not already exist.
///
/// The tables are created in one exclusive transaction, so either all of them
/// are created or none are.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_record_table(&transaction)?;
    create_user_table(&transaction)?;
    create_personal_access_token_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
