//! Opaque refresh tokens that are stored in the database and rotated on every use.
//!
//! Only the SHA-256 digest of a token is stored. The raw token is returned to
//! the client once, when it is issued.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{TokenConfig, User, UserID, get_user_by_id, issue_access_token},
    timestamp::get_timestamp,
};

/// The number of random bytes in a refresh token.
const TOKEN_BYTES: usize = 32;

/// A stored refresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    /// The user the token was issued to.
    pub user_id: UserID,
    /// When the token was issued.
    pub created_at: OffsetDateTime,
    /// The token is rejected at and after this time.
    pub expires_at: OffsetDateTime,
    /// Revoked tokens are never accepted again.
    pub revoked: bool,
}

impl RefreshToken {
    /// Whether the token can still be used at `now`.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// An access token and the refresh token that can be used to replace it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenPair {
    /// A signed, short lived access token.
    pub access_token: String,
    /// A single use refresh token.
    pub refresh_token: String,
    /// Always "Bearer".
    pub token_type: &'static str,
}

/// Create the refresh token table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_refresh_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS refresh_token (
                id INTEGER PRIMARY KEY,
                token_hash TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                revoked INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                );
        CREATE INDEX IF NOT EXISTS idx_refresh_token_user ON refresh_token(user_id);",
    )?;

    Ok(())
}

fn hash_token(raw_token: &str) -> String {
    format!("{:x}", Sha256::digest(raw_token.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    URL_SAFE_NO_PAD.encode(bytes)
}

/// Create a new refresh token for `user_id` and return the raw token.
///
/// # Errors
///
/// Returns an error if the token could not be stored.
pub fn issue_refresh_token(
    user_id: UserID,
    config: &TokenConfig,
    connection: &Connection,
) -> Result<String, Error> {
    issue_refresh_token_at(
        user_id,
        OffsetDateTime::now_utc(),
        config.refresh_token_duration,
        connection,
    )
}

fn issue_refresh_token_at(
    user_id: UserID,
    issued_at: OffsetDateTime,
    duration: Duration,
    connection: &Connection,
) -> Result<String, Error> {
    let raw_token = generate_token();

    connection.execute(
        "INSERT INTO refresh_token (token_hash, user_id, created_at, expires_at, revoked)
         VALUES (?1, ?2, ?3, ?4, 0)",
        (
            hash_token(&raw_token),
            user_id.as_i64(),
            issued_at.unix_timestamp(),
            (issued_at + duration).unix_timestamp(),
        ),
    )?;

    Ok(raw_token)
}

/// Issue an access token and a refresh token for `user`.
///
/// # Errors
///
/// Returns an error if either token could not be created.
pub fn issue_token_pair(
    user: &User,
    config: &TokenConfig,
    connection: &Connection,
) -> Result<TokenPair, Error> {
    let access_token = issue_access_token(user.id, config)?;
    let refresh_token = issue_refresh_token(user.id, config, connection)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer",
    })
}

fn get_refresh_token(raw_token: &str, connection: &Connection) -> Result<RefreshToken, Error> {
    connection
        .query_row(
            "SELECT user_id, created_at, expires_at, revoked FROM refresh_token
             WHERE token_hash = ?1",
            (hash_token(raw_token),),
            |row| {
                Ok(RefreshToken {
                    user_id: UserID::new(row.get(0)?),
                    created_at: get_timestamp(row, 1)?,
                    expires_at: get_timestamp(row, 2)?,
                    revoked: row.get(3)?,
                })
            },
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::TokenInvalid,
            error => error.into(),
        })
}

/// Look up a refresh token and return the user it was issued to.
///
/// # Errors
///
/// Returns [Error::TokenInvalid] if the token is unknown, revoked, expired or
/// belongs to an inactive user. These cases are deliberately indistinguishable.
pub fn verify_refresh_token(raw_token: &str, connection: &Connection) -> Result<User, Error> {
    let token = get_refresh_token(raw_token, connection)?;

    if !token.is_valid_at(OffsetDateTime::now_utc()) {
        tracing::debug!("refresh token for user {} is revoked or expired", token.user_id);
        return Err(Error::TokenInvalid);
    }

    let user = match get_user_by_id(token.user_id, connection) {
        Ok(user) => user,
        Err(Error::NotFound(_)) => return Err(Error::TokenInvalid),
        Err(error) => return Err(error),
    };

    if !user.is_active {
        tracing::debug!("refresh token used for inactive user {}", user.id);
        return Err(Error::TokenInvalid);
    }

    Ok(user)
}

/// Revoke a single refresh token owned by `user_id`.
///
/// Returns `false` if no such token exists for the user.
pub fn revoke_refresh_token(
    raw_token: &str,
    user_id: UserID,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "UPDATE refresh_token SET revoked = 1 WHERE token_hash = ?1 AND user_id = ?2",
        (hash_token(raw_token), user_id.as_i64()),
    )?;

    Ok(rows_affected > 0)
}

/// Revoke every active refresh token owned by `user_id` and return how many were revoked.
pub fn revoke_all_refresh_tokens(user_id: UserID, connection: &Connection) -> Result<usize, Error> {
    let rows_affected = connection.execute(
        "UPDATE refresh_token SET revoked = 1 WHERE user_id = ?1 AND revoked = 0",
        (user_id.as_i64(),),
    )?;

    Ok(rows_affected)
}

/// Exchange a refresh token for a new token pair, revoking the old token.
///
/// Verification, revocation and issuing run in one immediate transaction, so
/// when the same token is presented twice at once only one caller succeeds.
///
/// # Errors
///
/// Returns [Error::TokenInvalid] if the old token cannot be used. Nothing is
/// revoked in that case.
pub fn rotate_refresh_token(
    raw_token: &str,
    config: &TokenConfig,
    connection: &mut Connection,
) -> Result<TokenPair, Error> {
    let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let user = verify_refresh_token(raw_token, &transaction)?;

    let rows_affected = transaction.execute(
        "UPDATE refresh_token SET revoked = 1 WHERE token_hash = ?1 AND revoked = 0",
        (hash_token(raw_token),),
    )?;

    if rows_affected != 1 {
        return Err(Error::TokenInvalid);
    }

    let token_pair = issue_token_pair(&user, config, &transaction)?;
    transaction.commit()?;

    Ok(token_pair)
}
