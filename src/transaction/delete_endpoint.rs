//! Endpoint for deleting a transaction and reversing its balance changes.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    db::lock_connection,
    transaction::{TransactionState, ledger::delete_transaction},
};

/// The response body for a successful delete.
#[derive(Debug, Serialize)]
pub struct DeleteTransactionResponse {
    /// A confirmation message.
    pub message: &'static str,
}

/// A route handler for deleting a transaction owned by the acting user.
///
/// Responds with 404 if the transaction does not exist or belongs to another user.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<DeleteTransactionResponse>, Error> {
    let mut connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, user_id, &mut connection).inspect_err(|error| {
        tracing::debug!("could not delete transaction {transaction_id}: {error}")
    })?;

    Ok(Json(DeleteTransactionResponse {
        message: "Transaction deleted",
    }))
}
