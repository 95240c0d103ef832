//! Defines the core data model and the raw database queries for ledger transactions.
//!
//! The functions in this module do not touch account balances. Use the
//! functions in [crate::transaction::ledger] to record or remove transactions.

use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    category::CategoryType,
    database_id::{AccountId, CategoryId, TagId, TransactionId},
    money::from_minor_units,
    timestamp::get_timestamp,
};

// ============================================================================
// MODELS
// ============================================================================

/// What a transaction does to the balances of its accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money leaving an account.
    Expense,
    /// Money entering an account.
    Income,
    /// Money moving from one account to another.
    Transfer,
}

impl TransactionType {
    /// The name stored in the database and used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
            TransactionType::Transfer => "transfer",
        }
    }

    /// The type a category must have to be attached to this kind of
    /// transaction, or `None` for transfers which never have a category.
    pub fn category_type(&self) -> Option<CategoryType> {
        match self {
            TransactionType::Expense => Some(CategoryType::Expense),
            TransactionType::Income => Some(CategoryType::Income),
            TransactionType::Transfer => None,
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(TransactionType::Expense),
            "income" => Ok(TransactionType::Income),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(Error::InvalidOperation(format!(
                "unknown transaction type \"{other}\""
            ))),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A single recorded movement of money.
///
/// Transactions are never edited. To correct one, delete it and record a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The owner of the transaction.
    pub user_id: UserID,
    /// What the transaction does to its accounts.
    pub transaction_type: TransactionType,
    /// The amount of money moved, always positive.
    pub amount: Decimal,
    /// The account money left (expense, transfer) or entered (income).
    pub account_id: AccountId,
    /// The account money entered, only set for transfers.
    pub to_account_id: Option<AccountId>,
    /// Never set for transfers.
    pub category_id: Option<CategoryId>,
    /// A free-form description.
    pub note: String,
    /// The day the money moved.
    pub date: Date,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// The data needed to insert a transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// What the transaction does to its accounts.
    pub transaction_type: TransactionType,
    /// The amount in cents, must be positive.
    pub amount: i64,
    /// The source account.
    pub account_id: AccountId,
    /// The destination account of a transfer.
    pub to_account_id: Option<AccountId>,
    /// The category of an expense or income.
    pub category_id: Option<CategoryId>,
    /// A free-form description.
    pub note: String,
    /// The day the money moved.
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, amount, account_id, \
     to_account_id, category_id, note, date, created_at";

/// Create the transaction and transaction_tag tables.
///
/// Amounts are stored as positive integer cents below
/// [MINOR_UNITS_LIMIT](crate::money::MINOR_UNITS_LIMIT). The checks ensure that only
/// transfers have a destination account and that transfers have no category.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            transaction_type TEXT NOT NULL
                CHECK (transaction_type IN ('expense', 'income', 'transfer')),
            amount INTEGER NOT NULL CHECK (amount > 0 AND amount < 1000000000000000),
            account_id INTEGER NOT NULL,
            to_account_id INTEGER,
            category_id INTEGER,
            note TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            CHECK ((transaction_type = 'transfer') = (to_account_id IS NOT NULL)),
            CHECK (transaction_type != 'transfer' OR category_id IS NULL),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transaction_user_date
            ON \"transaction\"(user_id, date, created_at);
        CREATE INDEX IF NOT EXISTS idx_transaction_account ON \"transaction\"(account_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id);

        CREATE TABLE IF NOT EXISTS transaction_tag (
            transaction_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY(transaction_id, tag_id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tag(id) ON UPDATE CASCADE ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_transaction_tag_tag ON transaction_tag(tag_id);",
    )?;

    Ok(())
}

/// Create the triggers that stop a row from referencing rows owned by another user.
///
/// A rejected write fails with `SQLITE_CONSTRAINT_TRIGGER`, which converts to
/// [Error::TenantMismatch].
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_owner_triggers(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TRIGGER IF NOT EXISTS transaction_owner_check
        BEFORE INSERT ON \"transaction\"
        FOR EACH ROW
        WHEN (SELECT user_id FROM account WHERE id = NEW.account_id) IS NOT NEW.user_id
            OR (NEW.to_account_id IS NOT NULL
                AND (SELECT user_id FROM account WHERE id = NEW.to_account_id) IS NOT NEW.user_id)
            OR (NEW.category_id IS NOT NULL
                AND (SELECT user_id FROM category WHERE id = NEW.category_id) IS NOT NEW.user_id)
        BEGIN
            SELECT RAISE(ABORT, 'transaction references a row owned by another user');
        END;

        CREATE TRIGGER IF NOT EXISTS transaction_tag_owner_check
        BEFORE INSERT ON transaction_tag
        FOR EACH ROW
        WHEN (SELECT user_id FROM tag WHERE id = NEW.tag_id)
            IS NOT (SELECT user_id FROM \"transaction\" WHERE id = NEW.transaction_id)
        BEGIN
            SELECT RAISE(ABORT, 'tag is owned by another user');
        END;",
    )?;

    Ok(())
}

/// Insert a transaction row owned by `user_id`.
///
/// The caller is responsible for adjusting account balances in the same
/// database transaction.
///
/// # Errors
///
/// Returns [Error::TenantMismatch] if an account or category belongs to
/// another user, or [Error::SqlError] for other SQL errors.
pub fn insert_transaction(
    new_transaction: &NewTransaction,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let created_at = OffsetDateTime::now_utc().unix_timestamp();

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (user_id, transaction_type, amount, account_id, to_account_id, category_id,
                 note, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                new_transaction.transaction_type,
                new_transaction.amount,
                new_transaction.account_id,
                new_transaction.to_account_id,
                new_transaction.category_id,
                &new_transaction.note,
                new_transaction.date,
                created_at,
            ),
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Get the transaction with `transaction_id` if it is owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn get_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &transaction_id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Transaction"),
            error => error.into(),
        })
}

/// Delete the transaction row and its tag links.
///
/// # Errors
///
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn delete_transaction_row(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        &[(":id", &transaction_id), (":user_id", &user_id.as_i64())],
    )?;

    if rows_affected != 1 {
        return Err(Error::NotFound("Transaction"));
    }

    Ok(())
}

/// Attach the tags in `tag_ids` to a transaction.
///
/// Tag IDs that do not exist or belong to another user are skipped, as are
/// duplicates.
///
/// # Errors
///
/// Returns [Error::SqlError] if the SQL query failed.
pub fn set_transaction_tags(
    transaction_id: TransactionId,
    tag_ids: &[TagId],
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM transaction_tag WHERE transaction_id = ?1",
        (transaction_id,),
    )?;

    let mut statement = connection.prepare(
        "INSERT INTO transaction_tag (transaction_id, tag_id)
         SELECT ?1, id FROM tag WHERE id = ?2 AND user_id = ?3",
    )?;

    for tag_id in tag_ids.iter().collect::<BTreeSet<_>>() {
        let inserted = statement.execute((transaction_id, tag_id, user_id.as_i64()))?;

        if inserted == 0 {
            tracing::debug!("skipped unknown tag {tag_id} for transaction {transaction_id}");
        }
    }

    Ok(())
}

/// Map a database row of [TRANSACTION_COLUMNS] to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let amount: i64 = row.get(3)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        transaction_type: row.get(2)?,
        amount: from_minor_units(amount),
        account_id: row.get(4)?,
        to_account_id: row.get(5)?,
        category_id: row.get(6)?,
        note: row.get(7)?,
        date: row.get(8)?,
        created_at: get_timestamp(row, 9)?,
    })
}
