//! The endpoint for exchanging a refresh token for a new token pair.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{TokenConfig, TokenPair, rotate_refresh_token},
    db::lock_connection,
};

/// The state needed to rotate refresh tokens.
#[derive(Debug, Clone)]
pub struct RefreshState {
    /// The database connection holding the refresh tokens.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys used to sign the new access token.
    pub token_config: TokenConfig,
}

impl FromRef<AppState> for RefreshState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_config: state.token_config.clone(),
        }
    }
}

/// A request body carrying a refresh token.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    /// The raw refresh token.
    pub refresh_token: String,
}

/// Handler for refresh requests. The old refresh token is revoked.
///
/// # Errors
///
/// Returns a 401 response if the token is unknown, expired or already used.
pub async fn refresh_tokens(
    State(state): State<RefreshState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, Error> {
    let mut connection = lock_connection(&state.db_connection)?;

    let tokens = rotate_refresh_token(&request.refresh_token, &state.token_config, &mut connection)?;

    Ok(Json(tokens))
}

#[cfg(test)]
mod refresh_tokens_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState,
        auth::{TokenConfig, issue_refresh_token, test_utils::insert_test_user},
        endpoints,
    };

    use super::refresh_tokens;

    fn get_test_server() -> (TestServer, String) {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, TokenConfig::new(b"foobar"))
            .expect("Could not create app state.");
        let refresh_token = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("a@x.com", &connection);
            issue_refresh_token(user.id, &state.token_config, &connection).unwrap()
        };
        let app = Router::new()
            .route(endpoints::REFRESH, post(refresh_tokens))
            .with_state(state);

        (
            TestServer::try_new(app).expect("Could not create test server."),
            refresh_token,
        )
    }

    #[tokio::test]
    async fn refresh_rotates_token() {
        let (server, refresh_token) = get_test_server();

        let response = server
            .post(endpoints::REFRESH)
            .json(&json!({ "refresh_token": refresh_token }))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_ne!(body["refresh_token"], refresh_token.as_str());
        assert_eq!(body["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn reused_refresh_token_is_rejected() {
        let (server, refresh_token) = get_test_server();
        server
            .post(endpoints::REFRESH)
            .json(&json!({ "refresh_token": refresh_token }))
            .await
            .assert_status_ok();

        let response = server
            .post(endpoints::REFRESH)
            .json(&json!({ "refresh_token": refresh_token }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "detail": "Invalid token" }));
    }

    #[tokio::test]
    async fn unknown_refresh_token_is_rejected() {
        let (server, _) = get_test_server();

        server
            .post(endpoints::REFRESH)
            .json(&json!({ "refresh_token": "nope" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
