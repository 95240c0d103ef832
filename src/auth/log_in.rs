//! The endpoint for logging in with an email and password.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{AuthResponse, Email, TokenConfig, get_user_by_email, issue_token_pair},
    db::lock_connection,
};

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys used to sign the user's tokens.
    pub token_config: TokenConfig,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_config: state.token_config.clone(),
        }
    }
}

/// The request body for logging in.
#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    /// Compared with registered emails ignoring case.
    pub email: Email,
    /// The plain text password.
    pub password: String,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email does not belong to a registered user.
/// - The password is not correct.
/// - The user has been deactivated.
/// - An internal error occurred when verifying the password.
pub async fn post_log_in(
    State(state): State<LoginState>,
    Json(request): Json<LogInRequest>,
) -> Result<Json<AuthResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let user = match get_user_by_email(request.email.as_ref(), &connection) {
        Ok(user) => user,
        Err(Error::NotFound(_)) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    let is_password_valid = user.password_hash.verify(&request.password).map_err(|error| {
        tracing::error!("Unhandled error while verifying credentials: {error}");
        Error::HashingError(error.to_string())
    })?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    if !user.is_active {
        tracing::debug!("inactive user {} tried to log in", user.id);
        return Err(Error::InvalidCredentials);
    }

    let tokens = issue_token_pair(&user, &state.token_config, &connection)?;

    Ok(Json(AuthResponse { user, tokens }))
}
