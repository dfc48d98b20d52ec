//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{Error, db::initialize, record::RecordSchema};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The fields clients may write to a financial record.
    pub record_schema: Arc<RecordSchema>,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, record_schema: RecordSchema) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            record_schema: Arc::new(record_schema),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

/// Acquire the database lock, logging if another thread panicked while holding it.
pub(crate) fn lock_connection(
    connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    use rusqlite::Connection;

    use crate::{Error, app_state::lock_connection};

    #[test]
    fn lock_connection_returns_guard() {
        let connection = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));

        let guard = lock_connection(&connection).unwrap();

        assert_eq!(
            guard.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)),
            Ok(1)
        );
    }

    #[test]
    fn poisoned_lock_is_database_lock_error() {
        let connection = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));

        let poisoner = connection.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(
            lock_connection(&connection).err(),
            Some(Error::DatabaseLockError)
        );
    }
}
