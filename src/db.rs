//! Database setup: connection settings, table creation and lock handling.

use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    auth::{create_refresh_token_table, create_user_table},
    category::create_category_table,
    tag::create_tag_table,
    transaction::{create_owner_triggers, create_transaction_table},
};

/// How long a connection waits for another connection's write lock before
/// giving up with `SQLITE_BUSY`.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Apply the per-connection settings.
///
/// Foreign keys are off by default in SQLite and must be enabled on every
/// connection for the cascades to run.
///
/// # Errors
///
/// This function will return an error if a pragma could not be set.
pub fn configure(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(BUSY_TIMEOUT)?;

    Ok(())
}

/// Configure the connection and create the tables and triggers for the domain models.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
///
/// This function will return an error if any of the SQL statements failed.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    configure(connection)?;

    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_refresh_token_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_tag_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_owner_triggers(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the shared database connection.
///
/// # Errors
///
/// Returns [Error::DatabaseLockError] if the mutex has been poisoned.
pub(crate) fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

#[cfg(test)]
mod db_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use crate::Error;

    use super::{initialize, lock_connection};

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).expect("first initialization failed");
        initialize(&connection).expect("second initialization failed");
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: bool = connection
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let db_connection = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let poisoner = db_connection.clone();

        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(
            lock_connection(&db_connection),
            Err(Error::DatabaseLockError)
        ));
    }
}
