//! Authentication middleware that resolves a bearer token to the acting user.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{TokenConfig, User, UserID, get_active_user_by_id, verify_access_token},
};

/// Turns a credential presented by a client into the ID of the user it was issued for.
pub trait VerifyCredential {
    /// Verify `credential` and return the user ID it identifies.
    fn verify(&self, credential: &str) -> Result<UserID, Error>;
}

impl VerifyCredential for TokenConfig {
    fn verify(&self, credential: &str) -> Result<UserID, Error> {
        verify_access_token(credential, self)
    }
}

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The database connection used to load the acting user.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys used to verify access tokens.
    pub token_config: TokenConfig,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_config: state.token_config.clone(),
        }
    }
}

/// Resolve `credential` to an active user.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] for every failure: a bad signature, an
/// expired token, or a user that is inactive or no longer exists. The concrete
/// reason is only logged.
pub fn authenticate(
    credential: &str,
    verifier: &impl VerifyCredential,
    connection: &Connection,
) -> Result<User, Error> {
    let user_id = verifier.verify(credential).map_err(|error| {
        tracing::debug!("rejected access token: {error}");
        Error::Unauthenticated
    })?;

    get_active_user_by_id(user_id, connection).map_err(|error| {
        tracing::debug!("rejected access token for user {user_id}: {error}");
        Error::Unauthenticated
    })
}

/// Middleware function that checks for a valid bearer token.
///
/// The acting user and their ID are placed into the request extensions and the
/// request executed normally if the token is valid, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>() else {
        tracing::debug!("request to {} has no bearer token", request.uri().path());
        return Error::Unauthenticated.into_response();
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match authenticate(bearer.token(), &state.token_config, &connection) {
            Ok(user) => user,
            Err(error) => return error.into_response(),
        }
    };

    request.extensions_mut().insert(user.id);
    request.extensions_mut().insert(user);

    next.run(request).await
}
