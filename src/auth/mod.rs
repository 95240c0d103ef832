//! Users, credentials and the tokens that authenticate API requests.

mod email;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod refresh;
mod refresh_token;
mod register;
mod token;
mod user;

pub use email::Email;
pub use log_in::post_log_in;
pub use log_out::{get_current_user, log_out, log_out_all};
pub use middleware::{AuthState, VerifyCredential, auth_guard, authenticate};
pub use password::{PasswordHash, ValidatedPassword};
pub use refresh::{RefreshTokenRequest, refresh_tokens};
pub use refresh_token::{
    RefreshToken, TokenPair, issue_refresh_token, issue_token_pair, revoke_all_refresh_tokens,
    revoke_refresh_token, rotate_refresh_token, verify_refresh_token,
};
pub use register::{AuthResponse, register_user};
pub use token::{
    AccessClaims, DEFAULT_ACCESS_TOKEN_DURATION, DEFAULT_REFRESH_TOKEN_DURATION, TokenConfig,
    issue_access_token, verify_access_token,
};
pub use user::{
    NewUser, User, UserID, create_user, create_user_table, deactivate_user, delete_user,
    email_exists, get_active_user_by_id, get_user_by_email, get_user_by_id, set_user_active,
};

pub(crate) use refresh_token::create_refresh_token_table;

#[cfg(test)]
pub(crate) use user::test_utils;
