//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/accounts/{account_id}', use [format_endpoint].

/// Create a user and get the first token pair.
pub const REGISTER: &str = "/api/auth/register";
/// Exchange an email and password for a token pair.
pub const LOG_IN: &str = "/api/auth/login";
/// Exchange a refresh token for a new token pair.
pub const REFRESH: &str = "/api/auth/refresh";
/// Revoke a single refresh token.
pub const LOG_OUT: &str = "/api/auth/logout";
/// Revoke every refresh token of the acting user.
pub const LOG_OUT_ALL: &str = "/api/auth/logout-all";
/// The acting user's details.
pub const ME: &str = "/api/auth/me";

/// Create and list accounts.
pub const ACCOUNTS: &str = "/api/ledger/accounts";
/// A single account.
pub const ACCOUNT: &str = "/api/ledger/accounts/{account_id}";
/// Create and list categories.
pub const CATEGORIES: &str = "/api/ledger/categories";
/// Create and list tags.
pub const TAGS: &str = "/api/ledger/tags";

/// Record an expense.
pub const EXPENSE: &str = "/api/ledger/transactions/expense";
/// Record income.
pub const INCOME: &str = "/api/ledger/transactions/income";
/// Record a transfer between two accounts.
pub const TRANSFER: &str = "/api/ledger/transactions/transfer";
/// List transactions.
pub const TRANSACTIONS: &str = "/api/ledger/transactions";
/// Expense totals per category.
pub const SPENDING_BY_CATEGORY: &str = "/api/ledger/transactions/spending-by-category";
/// Expense transactions grouped by category.
pub const TRANSACTIONS_BY_CATEGORY: &str = "/api/ledger/transactions/by-category";
/// Get or delete a single transaction.
pub const TRANSACTION: &str = "/api/ledger/transactions/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is the text between a left and right brace, e.g. '{account_id}'
/// in '/accounts/{account_id}'. Only the first parameter is replaced.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some((prefix, rest)) = endpoint_path.split_once('{') else {
        return endpoint_path.to_owned();
    };

    let suffix = rest.split_once('}').map_or("", |(_, suffix)| suffix);

    format!("{prefix}{id}{suffix}")
}
