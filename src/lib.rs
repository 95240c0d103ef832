//! A personal finance ledger served as a JSON REST API.
//!
//! Users register with an email and password and receive a short-lived
//! access token plus a rotating refresh token. Every ledger record (accounts,
//! categories, tags and transactions) belongs to exactly one user and is only
//! visible to that user.
//!
//! Recording an expense, income or transfer updates the affected account
//! balances in the same database transaction as the transaction record, and
//! deleting a transaction reverses its effect.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod category;
mod database_id;
mod db;
mod endpoints;
mod error;
mod logging;
mod money;
mod routing;
mod tag;
mod timestamp;
mod transaction;

pub use account::{Account, AccountType, NewAccount, create_account, get_account, list_accounts};
pub use app_state::AppState;
pub use auth::{
    Email, NewUser, PasswordHash, TokenConfig, TokenPair, User, UserID, ValidatedPassword,
    create_user, deactivate_user, delete_user, get_user_by_email, get_user_by_id,
    revoke_all_refresh_tokens, set_user_active,
};
pub use category::{Category, CategoryType, create_category, list_categories};
pub use database_id::{AccountId, CategoryId, DatabaseId, TagId, TransactionId};
pub use db::{configure as configure_db, initialize as initialize_db};
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use tag::{Tag, TagName, create_tag, get_all_tags};
pub use transaction::{
    CategorySpending, CategoryTransactions, DateRange, LedgerEntry, Transaction,
    TransactionDetail, TransactionFilter, TransactionType, delete_transaction,
    get_transaction_detail, list_transactions, record_expense, record_income, record_transfer,
    spending_by_category, transactions_by_category,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
