//! Ledger transactions: recording, reversing and querying movements of money.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and its tables, checks and owner triggers
//! - The ledger functions that apply and reverse balance changes atomically
//! - Queries for filtered listings and spending summaries
//! - The route handlers for the transaction endpoints

mod core;
mod create_endpoint;
mod delete_endpoint;
mod ledger;
mod query;
mod query_endpoint;

pub use core::{Transaction, TransactionType, create_owner_triggers, create_transaction_table};
pub use create_endpoint::{
    TransactionState, create_expense_endpoint, create_income_endpoint, create_transfer_endpoint,
};
pub use delete_endpoint::delete_transaction_endpoint;
pub use ledger::{LedgerEntry, delete_transaction, record_expense, record_income, record_transfer};
pub use query::{
    CategorySpending, CategoryTransactions, DateRange, TransactionDetail, TransactionFilter,
    get_transaction_detail, list_transactions, spending_by_category, transactions_by_category,
};
pub use query_endpoint::{
    get_transaction_endpoint, list_transactions_endpoint, spending_by_category_endpoint,
    transactions_by_category_endpoint,
};
