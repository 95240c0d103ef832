//! Endpoints for reading accounts.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::{Account, AccountState, get_account, list_accounts},
    auth::UserID,
    database_id::AccountId,
    db::lock_connection,
};

/// List the acting user's active accounts.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_accounts(user_id, &connection).map(Json)
}

/// Get a single account, including its current balance.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(account_id, user_id, &connection).map(Json)
}
