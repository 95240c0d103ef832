//! Endpoints for listing transactions and summarizing spending.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    db::lock_connection,
    transaction::{
        TransactionState,
        query::{
            CategorySpending, CategoryTransactions, DateRange, TransactionDetail,
            TransactionFilter, get_transaction_detail, list_transactions, spending_by_category,
            transactions_by_category,
        },
    },
};

/// Handler for listing the acting user's transactions, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<TransactionDetail>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_transactions(&filter, user_id, &connection)
        .inspect_err(|error| tracing::error!("could not list transactions: {error}"))
        .map(Json)
}

/// Handler for getting a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionDetail>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction_detail(transaction_id, user_id, &connection).map(Json)
}

/// Handler for the total spent per expense category.
pub async fn spending_by_category_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<CategorySpending>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    spending_by_category(range, user_id, &connection)
        .inspect_err(|error| tracing::error!("could not summarize spending: {error}"))
        .map(Json)
}

/// Handler for the expenses grouped by category.
pub async fn transactions_by_category_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<CategoryTransactions>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    transactions_by_category(range, user_id, &connection)
        .inspect_err(|error| tracing::error!("could not group transactions: {error}"))
        .map(Json)
}
