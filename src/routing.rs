//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState,
    account::{create_account_endpoint, get_account_endpoint, list_accounts_endpoint},
    auth::{
        auth_guard, get_current_user, log_out, log_out_all, post_log_in, refresh_tokens,
        register_user,
    },
    category::{create_category_endpoint, list_categories_endpoint},
    endpoints,
    tag::{create_tag_endpoint, list_tags_endpoint},
    transaction::{
        create_expense_endpoint, create_income_endpoint, create_transfer_endpoint,
        delete_transaction_endpoint, get_transaction_endpoint, list_transactions_endpoint,
        spending_by_category_endpoint, transactions_by_category_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::REFRESH, post(refresh_tokens));

    let protected_routes = Router::new()
        .route(endpoints::LOG_OUT, post(log_out))
        .route(endpoints::LOG_OUT_ALL, post(log_out_all))
        .route(endpoints::ME, get(get_current_user))
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(endpoints::ACCOUNT, get(get_account_endpoint))
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::TAGS,
            get(list_tags_endpoint).post(create_tag_endpoint),
        )
        .route(endpoints::EXPENSE, post(create_expense_endpoint))
        .route(endpoints::INCOME, post(create_income_endpoint))
        .route(endpoints::TRANSFER, post(create_transfer_endpoint))
        .route(endpoints::TRANSACTIONS, get(list_transactions_endpoint))
        .route(
            endpoints::SPENDING_BY_CATEGORY,
            get(spending_by_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_BY_CATEGORY,
            get(transactions_by_category_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Not found" })),
    )
        .into_response()
}
