//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{Email, PasswordHash, revoke_all_refresh_tokens},
    timestamp::get_timestamp,
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// Serializing a user never includes the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email the user logs in with.
    pub email: Email,
    /// The user's password hash.
    #[serde(skip)]
    pub password_hash: PasswordHash,
    /// Optional given name.
    pub first_name: String,
    /// Optional family name.
    pub last_name: String,
    /// Inactive users cannot log in or use their tokens.
    pub is_active: bool,
    /// When the user registered.
    #[serde(skip)]
    pub date_joined: OffsetDateTime,
}

/// The data needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The validated email address.
    pub email: Email,
    /// The already hashed password.
    pub password_hash: PasswordHash,
    /// Optional given name, may be empty.
    pub first_name: String,
    /// Optional family name, may be empty.
    pub last_name: String,
}

/// Create the user table.
///
/// Emails are unique regardless of case.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                is_active INTEGER NOT NULL DEFAULT 1,
                date_joined INTEGER NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const SELECT_USER: &str =
    "SELECT id, email, password, first_name, last_name, is_active, date_joined FROM user";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: Email::new_unchecked(&raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        is_active: row.get(5)?,
        date_joined: get_timestamp(row, 6)?,
    })
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a [Error::Conflict] if the email is already registered (in any
/// case), or [Error::SqlError] if another SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();
    let date_joined = now.replace_nanosecond(0).unwrap_or(now);

    connection.execute(
        "INSERT INTO user (email, password, first_name, last_name, is_active, date_joined)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        (
            new_user.email.as_ref(),
            new_user.password_hash.as_ref(),
            &new_user.first_name,
            &new_user.last_name,
            date_joined.unix_timestamp(),
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: new_user.email,
        password_hash: new_user.password_hash,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        is_active: true,
        date_joined,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("User"),
            error => error.into(),
        })
}

/// Get the active user with an ID equal to `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist or is inactive.
pub fn get_active_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    let user = get_user_by_id(user_id, connection)?;

    if !user.is_active {
        return Err(Error::NotFound("User"));
    }

    Ok(user)
}

/// Get the user with the given email, compared case-insensitively.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the email.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE email = :email COLLATE NOCASE"))?
        .query_row(&[(":email", &email.trim())], map_user_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("User"),
            error => error.into(),
        })
}

/// Check whether an email is already registered, ignoring case.
pub fn email_exists(email: &Email, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM user WHERE email = ?1 COLLATE NOCASE)",
            (email.as_ref(),),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Activate or deactivate a user.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn set_user_active(
    user_id: UserID,
    is_active: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET is_active = ?1 WHERE id = ?2",
        (is_active, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound("User"));
    }

    Ok(())
}

/// Deactivate a user and revoke all of their refresh tokens in one transaction.
///
/// Returns the number of refresh tokens that were revoked.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist. Nothing changes on error.
pub fn deactivate_user(user_id: UserID, connection: &mut Connection) -> Result<usize, Error> {
    let transaction = connection.transaction()?;

    set_user_active(user_id, false, &transaction)?;
    let revoked_count = revoke_all_refresh_tokens(user_id, &transaction)?;

    transaction.commit()?;

    Ok(revoked_count)
}

/// Delete a user and, through the foreign keys, everything the user owns.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM user WHERE id = ?1", (user_id.as_i64(),))?;

    if rows_affected == 0 {
        return Err(Error::NotFound("User"));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use rusqlite::Connection;

    use crate::auth::{Email, NewUser, PasswordHash, User, create_user};

    /// Insert a user with a fake password hash.
    pub fn insert_test_user(email: &str, connection: &Connection) -> User {
        create_user(
            NewUser {
                email: Email::new(email).unwrap(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
                first_name: String::new(),
                last_name: String::new(),
            },
            connection,
        )
        .expect("Could not create test user")
    }
}
