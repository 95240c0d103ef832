//! Signed access tokens and the configuration used to sign and verify them.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

/// The default lifetime of an access token.
pub const DEFAULT_ACCESS_TOKEN_DURATION: Duration = Duration::minutes(15);

/// The default lifetime of a refresh token.
pub const DEFAULT_REFRESH_TOKEN_DURATION: Duration = Duration::days(7);

const ACCESS_TOKEN_TYPE: &str = "access";
const ALGORITHM: Algorithm = Algorithm::HS256;

/// The keys and lifetimes used for issuing tokens.
#[derive(Clone)]
pub struct TokenConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// How long an access token is valid for after it is issued.
    pub access_token_duration: Duration,
    /// How long a refresh token is valid for after it is issued.
    pub refresh_token_duration: Duration,
}

impl TokenConfig {
    /// Create a config that signs tokens with `secret` and uses the default lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_duration: DEFAULT_ACCESS_TOKEN_DURATION,
            refresh_token_duration: DEFAULT_REFRESH_TOKEN_DURATION,
        }
    }

    /// Override the token lifetimes.
    pub fn with_durations(mut self, access_token: Duration, refresh_token: Duration) -> Self {
        self.access_token_duration = access_token;
        self.refresh_token_duration = refresh_token;
        self
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_token_duration", &self.access_token_duration)
            .field("refresh_token_duration", &self.refresh_token_duration)
            .finish_non_exhaustive()
    }
}

/// The contents of an access token.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// The user ID as a string.
    pub sub: String,
    /// Always "access" for tokens issued by [issue_access_token].
    #[serde(rename = "type")]
    pub token_type: String,
    /// Unix time the token was issued at.
    pub iat: i64,
    /// Unix time the token expires at.
    pub exp: i64,
}

/// Create a signed access token for `user_id` that expires after
/// [TokenConfig::access_token_duration].
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be signed.
pub fn issue_access_token(user_id: UserID, config: &TokenConfig) -> Result<String, Error> {
    issue_access_token_at(user_id, OffsetDateTime::now_utc(), config)
}

fn issue_access_token_at(
    user_id: UserID,
    issued_at: OffsetDateTime,
    config: &TokenConfig,
) -> Result<String, Error> {
    let claims = AccessClaims {
        sub: user_id.to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_owned(),
        iat: issued_at.unix_timestamp(),
        exp: (issued_at + config.access_token_duration).unix_timestamp(),
    };

    encode(&Header::new(ALGORITHM), &claims, &config.encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Verify the signature, expiry and type of an access token and return the
/// user ID it was issued for.
///
/// # Errors
///
/// Returns [Error::TokenExpired] if the token is signed correctly but has
/// expired, otherwise [Error::TokenInvalid] for any other problem.
pub fn verify_access_token(token: &str, config: &TokenConfig) -> Result<UserID, Error> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<AccessClaims>(token, &config.decoding_key, &validation)
        .map_err(|error| match error.kind() {
            ErrorKind::ExpiredSignature => Error::TokenExpired,
            _ => Error::TokenInvalid,
        })?
        .claims;

    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(Error::TokenInvalid);
    }

    claims
        .sub
        .parse::<i64>()
        .map(UserID::new)
        .map_err(|_| Error::TokenInvalid)
}
