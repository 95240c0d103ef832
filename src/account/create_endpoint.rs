//! The endpoint for creating an account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{Account, AccountType, DEFAULT_CURRENCY, NewAccount, create_account},
    auth::UserID,
    db::lock_connection,
};

/// The state needed for creating and reading accounts.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_owned()
}

/// The request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// The display name.
    pub name: String,
    /// One of checking, savings, credit, cash or investment.
    pub account_type: AccountType,
    /// The opening balance, zero if omitted.
    #[serde(default)]
    pub balance: Decimal,
    /// A three letter currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// An optional icon name.
    #[serde(default)]
    pub icon: String,
}

/// Handler for creating an account owned by the acting user.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let account = create_account(
        NewAccount {
            name: request.name,
            account_type: request.account_type,
            balance: request.balance,
            currency: request.currency,
            icon: request.icon,
        },
        user_id,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(account)))
}
