//! The endpoint for registering a new user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{
        Email, NewUser, PasswordHash, TokenConfig, TokenPair, User, ValidatedPassword,
        create_user, email_exists, issue_token_pair,
    },
    db::lock_connection,
};

/// The state needed for registering a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys used to sign the new user's tokens.
    pub token_config: TokenConfig,
    /// The bcrypt cost for hashing the new password.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_config: state.token_config.clone(),
            password_hash_cost: state.password_hash_cost,
        }
    }
}

/// The request body for registering a user.
///
/// The email and password are validated while the body is deserialized.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// The email to log in with.
    pub email: Email,
    /// At least eight characters.
    pub password: ValidatedPassword,
    /// Optional given name.
    #[serde(default)]
    pub first_name: String,
    /// Optional family name.
    #[serde(default)]
    pub last_name: String,
}

/// A user and their freshly issued tokens.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated user.
    pub user: User,
    /// The tokens for the user's session.
    pub tokens: TokenPair,
}

/// Handler for registration requests.
///
/// # Errors
///
/// Returns a 400 response if the email is already registered, ignoring case.
/// The user is only stored if their tokens could be issued too.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    let password_hash = PasswordHash::new(&request.password, state.password_hash_cost)?;

    let mut connection = lock_connection(&state.db_connection)?;
    let transaction = connection.transaction()?;

    if email_exists(&request.email, &transaction)? {
        return Err(Error::InvalidOperation("Email already registered".to_owned()));
    }

    let user = create_user(
        NewUser {
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
        },
        &transaction,
    )?;
    let tokens = issue_token_pair(&user, &state.token_config, &transaction)?;
    transaction.commit()?;

    tracing::info!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

#[cfg(test)]
mod register_user_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, auth::TokenConfig, endpoints};

    use super::register_user;

    fn get_test_state() -> AppState {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");

        AppState::new(connection, TokenConfig::new(b"foobar"))
            .expect("Could not create app state.")
            .with_password_hash_cost(4)
    }

    fn get_test_server_with_state(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::REGISTER, post(register_user))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn get_test_server() -> TestServer {
        get_test_server_with_state(get_test_state())
    }

    #[tokio::test]
    async fn register_returns_user_and_tokens() {
        let server = get_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": "a@x.com",
                "password": "SecurePass123!",
                "first_name": "Ada",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["first_name"], "Ada");
        assert_eq!(body["user"]["last_name"], "");
        assert_eq!(body["user"]["is_active"], true);
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["tokens"]["access_token"].as_str().is_some());
        assert!(body["tokens"]["refresh_token"].as_str().is_some());
        assert_eq!(body["tokens"]["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn duplicate_email_in_any_case_is_rejected() {
        let server = get_test_server();
        server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "a@x.com", "password": "SecurePass123!" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "A@X.COM", "password": "SecurePass123!" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let detail = response.json::<Value>()["detail"].as_str().unwrap().to_owned();
        assert!(detail.contains("already registered"), "got {detail}");
    }

    #[tokio::test]
    async fn short_password_fails_schema_validation() {
        let server = get_test_server();

        server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "a@x.com", "password": "short" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn invalid_email_fails_schema_validation() {
        let server = get_test_server();

        server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "not-an-email", "password": "SecurePass123!" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn user_is_not_stored_when_tokens_cannot_be_issued() {
        let state = get_test_state();
        state
            .db_connection
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE refresh_token")
            .unwrap();
        let server = get_test_server_with_state(state.clone());

        server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "a@x.com", "password": "SecurePass123!" }))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let user_count: i64 = state
            .db_connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(user_count, 0);
    }
}
