//! Endpoints for recording expenses, income and transfers.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    database_id::{AccountId, CategoryId, TagId},
    db::lock_connection,
    transaction::{
        ledger::{LedgerEntry, record_expense, record_income, record_transfer},
        query::{TransactionDetail, get_transaction_detail},
    },
};

/// The state needed for recording, querying and deleting transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for recording an expense or income.
#[derive(Debug, Deserialize)]
pub struct CategorizedTransactionRequest {
    /// Must be positive with at most two decimal places.
    pub amount: Decimal,
    /// The account the money leaves (expense) or enters (income).
    pub account_id: AccountId,
    /// Must have the same type as the transaction.
    pub category_id: CategoryId,
    /// The day the money moved.
    pub date: Date,
    /// Defaults to an empty note.
    #[serde(default)]
    pub note: String,
    /// Unknown tag IDs are ignored.
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl CategorizedTransactionRequest {
    fn into_parts(self) -> (AccountId, CategoryId, LedgerEntry) {
        (
            self.account_id,
            self.category_id,
            LedgerEntry {
                amount: self.amount,
                date: self.date,
                note: self.note,
                tag_ids: self.tag_ids,
            },
        )
    }
}

/// The request body for recording a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Must be positive with at most two decimal places.
    pub amount: Decimal,
    /// The account the money leaves.
    pub from_account_id: AccountId,
    /// The account the money enters, must differ from `from_account_id`.
    pub to_account_id: AccountId,
    /// The day the money moved.
    pub date: Date,
    /// Defaults to an empty note.
    #[serde(default)]
    pub note: String,
    /// Unknown tag IDs are ignored.
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

type CreatedResponse = Result<(StatusCode, Json<TransactionDetail>), Response>;

/// Handler for recording an expense.
pub async fn create_expense_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CategorizedTransactionRequest>,
) -> CreatedResponse {
    let mut connection =
        lock_connection(&state.db_connection).map_err(IntoResponse::into_response)?;
    let (account_id, category_id, entry) = request.into_parts();

    let transaction = record_expense(account_id, category_id, entry, user_id, &mut connection)
        .inspect_err(|error| tracing::debug!("could not record expense: {error}"))
        .map_err(Error::into_bad_request_response)?;

    created(get_transaction_detail(transaction.id, user_id, &connection))
}

/// Handler for recording income.
pub async fn create_income_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CategorizedTransactionRequest>,
) -> CreatedResponse {
    let mut connection =
        lock_connection(&state.db_connection).map_err(IntoResponse::into_response)?;
    let (account_id, category_id, entry) = request.into_parts();

    let transaction = record_income(account_id, category_id, entry, user_id, &mut connection)
        .inspect_err(|error| tracing::debug!("could not record income: {error}"))
        .map_err(Error::into_bad_request_response)?;

    created(get_transaction_detail(transaction.id, user_id, &connection))
}

/// Handler for recording a transfer between two of the user's accounts.
pub async fn create_transfer_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<TransferRequest>,
) -> CreatedResponse {
    let mut connection =
        lock_connection(&state.db_connection).map_err(IntoResponse::into_response)?;
    let entry = LedgerEntry {
        amount: request.amount,
        date: request.date,
        note: request.note,
        tag_ids: request.tag_ids,
    };

    let transaction = record_transfer(
        request.from_account_id,
        request.to_account_id,
        entry,
        user_id,
        &mut connection,
    )
    .inspect_err(|error| tracing::debug!("could not record transfer: {error}"))
    .map_err(Error::into_bad_request_response)?;

    created(get_transaction_detail(transaction.id, user_id, &connection))
}

fn created(detail: Result<TransactionDetail, Error>) -> CreatedResponse {
    detail
        .map(|detail| (StatusCode::CREATED, Json(detail)))
        .map_err(IntoResponse::into_response)
}

#[cfg(test)]
mod create_transaction_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        AppState,
        account::{get_account, test_utils::insert_test_account},
        auth::{TokenConfig, User, test_utils::insert_test_user},
        category::{CategoryType, test_utils::insert_test_category},
        endpoints,
    };

    use super::{create_expense_endpoint, create_income_endpoint, create_transfer_endpoint};

    fn get_test_state() -> AppState {
        let connection =
            rusqlite::Connection::open_in_memory().expect("Could not open database in memory.");
        AppState::new(connection, TokenConfig::new(b"test secret"))
            .expect("Could not create app state")
    }

    fn get_test_server(state: AppState, user: User) -> TestServer {
        let app = Router::new()
            .route(endpoints::EXPENSE, post(create_expense_endpoint))
            .route(endpoints::INCOME, post(create_income_endpoint))
            .route(endpoints::TRANSFER, post(create_transfer_endpoint))
            .layer(axum::Extension(user.id))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn create_expense_returns_detail_and_updates_balance() {
        let state = get_test_state();
        let (user, account, food) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("foo@bar.baz", &connection);
            let account = insert_test_account("Main", "1000.00", user.id, &connection);
            let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
            (user, account, food)
        };
        let server = get_test_server(state.clone(), user.clone());

        let response = server
            .post(endpoints::EXPENSE)
            .json(&json!({
                "amount": "50.00",
                "account_id": account.id,
                "category_id": food.id,
                "date": "2025-01-15",
                "note": "Groceries",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["transaction_type"], "expense");
        assert_eq!(body["amount"], "50.00");
        assert_eq!(body["account"]["balance"], "950.00");
        assert_eq!(body["category"]["name"], "Food");
        assert_eq!(body["date"], "2025-01-15");
        assert_eq!(body["to_account"], Value::Null);
        assert_eq!(body["tags"], json!([]));

        let connection = state.db_connection.lock().unwrap();
        let balance = get_account(account.id, user.id, &connection).unwrap().balance;
        assert_eq!(balance.to_string(), "950.00");
    }

    #[tokio::test]
    async fn create_income_with_expense_category_is_bad_request() {
        let state = get_test_state();
        let (user, account, food) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("foo@bar.baz", &connection);
            let account = insert_test_account("Main", "10.00", user.id, &connection);
            let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
            (user, account, food)
        };
        let server = get_test_server(state, user);

        let response = server
            .post(endpoints::INCOME)
            .json(&json!({
                "amount": "5.00",
                "account_id": account.id,
                "category_id": food.id,
                "date": "2025-01-15",
            }))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({ "detail": "Category not found" }));
    }

    #[tokio::test]
    async fn create_transfer_moves_money() {
        let state = get_test_state();
        let (user, from, to) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("foo@bar.baz", &connection);
            let from = insert_test_account("Checking", "12450.80", user.id, &connection);
            let to = insert_test_account("Savings", "4200.00", user.id, &connection);
            (user, from, to)
        };
        let server = get_test_server(state, user);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&json!({
                "amount": "2450.00",
                "from_account_id": from.id,
                "to_account_id": to.id,
                "date": "2025-01-15",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["transaction_type"], "transfer");
        assert_eq!(body["account"]["balance"], "10000.80");
        assert_eq!(body["to_account"]["balance"], "6650.00");
        assert_eq!(body["category"], Value::Null);
    }

    #[tokio::test]
    async fn create_transfer_to_same_account_is_bad_request() {
        let state = get_test_state();
        let (user, account) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("foo@bar.baz", &connection);
            let account = insert_test_account("Main", "100.00", user.id, &connection);
            (user, account)
        };
        let server = get_test_server(state, user);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&json!({
                "amount": "10.00",
                "from_account_id": account.id,
                "to_account_id": account.id,
                "date": "2025-01-15",
            }))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({ "detail": "Cannot transfer to the same account" }));
    }

    #[tokio::test]
    async fn create_expense_with_zero_amount_is_bad_request() {
        let state = get_test_state();
        let (user, account, food) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("foo@bar.baz", &connection);
            let account = insert_test_account("Main", "100.00", user.id, &connection);
            let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
            (user, account, food)
        };
        let server = get_test_server(state, user);

        let response = server
            .post(endpoints::EXPENSE)
            .json(&json!({
                "amount": "0",
                "account_id": account.id,
                "category_id": food.id,
                "date": "2025-01-15",
            }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn create_expense_with_missing_date_is_unprocessable() {
        let state = get_test_state();
        let (user, account, food) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("foo@bar.baz", &connection);
            let account = insert_test_account("Main", "100.00", user.id, &connection);
            let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
            (user, account, food)
        };
        let server = get_test_server(state, user);

        let response = server
            .post(endpoints::EXPENSE)
            .json(&json!({
                "amount": "1.00",
                "account_id": account.id,
                "category_id": food.id,
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
