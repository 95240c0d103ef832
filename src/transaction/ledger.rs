//! Records and removes transactions while keeping account balances consistent.
//!
//! Every function runs inside a single `IMMEDIATE` SQLite transaction: the
//! write lock is taken before any row is read, so the ownership checks, the
//! relative balance updates and the transaction row either all persist or
//! none do.

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    account::{adjust_balance, get_account},
    auth::UserID,
    category::get_category_of_type,
    database_id::{AccountId, CategoryId, TagId, TransactionId},
    money::{positive_minor_units, to_minor_units},
    transaction::core::{
        NewTransaction, Transaction, TransactionType, delete_transaction_row, get_transaction,
        insert_transaction, set_transaction_tags,
    },
};

/// The fields shared by every kind of ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Must be greater than zero with at most two decimal places.
    pub amount: Decimal,
    /// The day the money moved.
    pub date: Date,
    /// A free-form description.
    pub note: String,
    /// Tags to attach. Unknown IDs are ignored.
    pub tag_ids: Vec<TagId>,
}

/// Record money spent from `account_id` and subtract it from the account balance.
///
/// # Errors
///
/// - [Error::InvalidOperation] if the amount is not positive.
/// - [Error::NotFound] if the account is not owned by `user_id`, or the
///   category is not an expense category owned by `user_id`.
pub fn record_expense(
    account_id: AccountId,
    category_id: CategoryId,
    entry: LedgerEntry,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    record_categorized(
        TransactionType::Expense,
        account_id,
        category_id,
        entry,
        user_id,
        connection,
    )
}

/// Record money received into `account_id` and add it to the account balance.
///
/// # Errors
///
/// - [Error::InvalidOperation] if the amount is not positive.
/// - [Error::NotFound] if the account is not owned by `user_id`, or the
///   category is not an income category owned by `user_id`.
pub fn record_income(
    account_id: AccountId,
    category_id: CategoryId,
    entry: LedgerEntry,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    record_categorized(
        TransactionType::Income,
        account_id,
        category_id,
        entry,
        user_id,
        connection,
    )
}

fn record_categorized(
    transaction_type: TransactionType,
    account_id: AccountId,
    category_id: CategoryId,
    entry: LedgerEntry,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let category_type = transaction_type.category_type().ok_or_else(|| {
        Error::InvalidOperation("Transfers cannot have a category".to_owned())
    })?;
    let amount = positive_minor_units(entry.amount)?;
    let delta = match transaction_type {
        TransactionType::Income => amount,
        _ => -amount,
    };

    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    get_account(account_id, user_id, &sql_transaction)?;
    get_category_of_type(category_id, category_type, user_id, &sql_transaction)?;

    adjust_balance(account_id, delta, user_id, &sql_transaction)?;
    let transaction = insert_transaction(
        &NewTransaction {
            transaction_type,
            amount,
            account_id,
            to_account_id: None,
            category_id: Some(category_id),
            note: entry.note,
            date: entry.date,
        },
        user_id,
        &sql_transaction,
    )?;
    set_transaction_tags(transaction.id, &entry.tag_ids, user_id, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::debug!(
        "recorded {transaction_type} {} of {} for account {account_id}",
        transaction.id,
        transaction.amount
    );

    Ok(transaction)
}

/// Move money from `from_account_id` to `to_account_id`.
///
/// # Errors
///
/// - [Error::InvalidOperation] if the amount is not positive or both accounts
///   are the same.
/// - [Error::NotFound] if either account is not owned by `user_id`.
pub fn record_transfer(
    from_account_id: AccountId,
    to_account_id: AccountId,
    entry: LedgerEntry,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let amount = positive_minor_units(entry.amount)?;

    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    get_account(from_account_id, user_id, &sql_transaction)?;
    get_account(to_account_id, user_id, &sql_transaction)?;

    if from_account_id == to_account_id {
        return Err(Error::InvalidOperation(
            "Cannot transfer to the same account".to_owned(),
        ));
    }

    adjust_balance(from_account_id, -amount, user_id, &sql_transaction)?;
    adjust_balance(to_account_id, amount, user_id, &sql_transaction)?;
    let transaction = insert_transaction(
        &NewTransaction {
            transaction_type: TransactionType::Transfer,
            amount,
            account_id: from_account_id,
            to_account_id: Some(to_account_id),
            category_id: None,
            note: entry.note,
            date: entry.date,
        },
        user_id,
        &sql_transaction,
    )?;
    set_transaction_tags(transaction.id, &entry.tag_ids, user_id, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::debug!(
        "recorded transfer {} of {} from account {from_account_id} to account {to_account_id}",
        transaction.id,
        transaction.amount
    );

    Ok(transaction)
}

/// Delete a transaction and undo its effect on account balances.
///
/// The reversal uses the amount and accounts stored with the transaction,
/// never values supplied by the caller.
///
/// # Errors
///
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn delete_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let transaction = get_transaction(transaction_id, user_id, &sql_transaction)?;
    let amount = to_minor_units(transaction.amount)?;

    match (transaction.transaction_type, transaction.to_account_id) {
        (TransactionType::Expense, _) => {
            adjust_balance(transaction.account_id, amount, user_id, &sql_transaction)?;
        }
        (TransactionType::Income, _) => {
            adjust_balance(transaction.account_id, -amount, user_id, &sql_transaction)?;
        }
        (TransactionType::Transfer, Some(to_account_id)) => {
            adjust_balance(transaction.account_id, amount, user_id, &sql_transaction)?;
            adjust_balance(to_account_id, -amount, user_id, &sql_transaction)?;
        }
        (TransactionType::Transfer, None) => {
            tracing::error!("transfer {transaction_id} has no destination account");
            return Err(Error::InvalidOperation(
                "Transfer has no destination account".to_owned(),
            ));
        }
    }

    delete_transaction_row(transaction_id, user_id, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::debug!("deleted transaction {transaction_id} and reversed its balance changes");

    Ok(transaction)
}
