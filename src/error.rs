//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The email and password combination did not match an active user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request did not carry a usable access token, or the token belongs
    /// to a user that is inactive or no longer exists.
    ///
    /// The concrete reason is logged but never sent to the client.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The access token has a valid signature but has expired.
    #[error("token has expired")]
    TokenExpired,

    /// The token could not be verified: bad signature, malformed, wrong token
    /// type, or, for refresh tokens, unknown, revoked or expired.
    #[error("invalid token")]
    TokenInvalid,

    /// An owner scoped lookup did not find the named entity.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request violates a domain rule, e.g. transferring money to the
    /// same account.
    #[error("{0}")]
    InvalidOperation(String),

    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// The database refused a write that referenced another user's rows.
    #[error("the referenced row belongs to another user")]
    TenantMismatch,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The access token could not be signed.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(left), Self::NotFound(right)) => left == right,
            (Self::InvalidOperation(left), Self::InvalidOperation(right)) => left == right,
            (Self::Conflict(left), Self::Conflict(right)) => left == right,
            (Self::HashingError(left), Self::HashingError(right)) => left == right,
            (Self::TokenCreation(left), Self::TokenCreation(right)) => left == right,
            (Self::SqlError(left), Self::SqlError(right)) => left == right,
            (left, right) => std::mem::discriminant(left) == std::mem::discriminant(right),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.ends_with("user.email") => {
                Error::Conflict("Email already registered".to_owned())
            }
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER,
                },
                _,
            ) => {
                tracing::warn!("tenant isolation trigger rejected a write: {value}");
                Error::TenantMismatch
            }
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_CHECK,
                },
                Some(ref desc),
            ) if desc.contains("balance_in_range") => {
                Error::InvalidOperation("Account balance is out of range".to_owned())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Resource"),
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

fn detail_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidCredentials => {
                detail_response(StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            Error::Unauthenticated => detail_response(StatusCode::UNAUTHORIZED, "Unauthorized"),
            Error::TokenExpired => detail_response(StatusCode::UNAUTHORIZED, "Token has expired"),
            Error::TokenInvalid => detail_response(StatusCode::UNAUTHORIZED, "Invalid token"),
            Error::NotFound(_) | Error::TenantMismatch => {
                detail_response(StatusCode::NOT_FOUND, &self.to_string())
            }
            Error::InvalidOperation(detail) => detail_response(StatusCode::BAD_REQUEST, &detail),
            Error::Conflict(detail) => detail_response(StatusCode::CONFLICT, &detail),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                detail_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl Error {
    /// Render the error for an endpoint that mutates the ledger.
    ///
    /// Lookup misses during a mutation mean the request referenced something
    /// the user does not own, so they are reported as a bad request rather
    /// than a missing resource.
    pub(crate) fn into_bad_request_response(self) -> Response {
        match self {
            Error::NotFound(_) | Error::TenantMismatch => {
                detail_response(StatusCode::BAD_REQUEST, &self.to_string())
            }
            error => error.into_response(),
        }
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn authentication_errors_are_unauthorized() {
        for error in [
            Error::InvalidCredentials,
            Error::Unauthenticated,
            Error::TokenExpired,
            Error::TokenInvalid,
        ] {
            assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn not_found_is_bad_request_for_mutations() {
        let response = Error::NotFound("Account").into_bad_request_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_is_404_otherwise() {
        let response = Error::NotFound("Account").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn sql_errors_are_hidden_from_the_client() {
        let response = Error::SqlError(rusqlite::Error::InvalidQuery).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound("Resource"));
    }
}
