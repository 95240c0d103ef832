//! Endpoints for revoking refresh tokens and reading the acting user.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState, Error,
    auth::{
        RefreshTokenRequest, User, UserID, revoke_all_refresh_tokens, revoke_refresh_token,
    },
    db::lock_connection,
};

/// The state needed for logging out.
#[derive(Debug, Clone)]
pub struct LogOutState {
    /// The database connection holding the refresh tokens.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The response body for a successful log out.
#[derive(Debug, Serialize)]
pub struct LogOutResponse {
    /// A human readable confirmation.
    pub message: &'static str,
    /// The number of refresh tokens that were revoked.
    pub revoked_count: usize,
}

/// Revoke the given refresh token of the acting user.
///
/// Unknown tokens and tokens of other users are ignored.
pub async fn log_out(
    State(state): State<LogOutState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<LogOutResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let revoked = revoke_refresh_token(&request.refresh_token, user_id, &connection)?;

    Ok(Json(LogOutResponse {
        message: "Successfully logged out",
        revoked_count: usize::from(revoked),
    }))
}

/// Revoke every active refresh token of the acting user.
pub async fn log_out_all(
    State(state): State<LogOutState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<LogOutResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let revoked_count = revoke_all_refresh_tokens(user_id, &connection)?;
    tracing::info!("revoked {revoked_count} refresh tokens for user {user_id}");

    Ok(Json(LogOutResponse {
        message: "Successfully logged out from all devices",
        revoked_count,
    }))
}

/// Get the acting user's details.
pub async fn get_current_user(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
