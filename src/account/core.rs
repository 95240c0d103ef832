//! Financial accounts and their running balances.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::AccountId,
    money::{from_minor_units, to_minor_units},
    timestamp::{get_timestamp, serialize_rfc3339},
};

/// The currency used when a new account does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// The kind of money container an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// An everyday bank account.
    Checking,
    /// A savings account.
    Savings,
    /// A credit card.
    Credit,
    /// Physical cash.
    Cash,
    /// A brokerage or other investment account.
    Investment,
}

impl AccountType {
    /// The name stored in the database and used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Credit => "credit",
            AccountType::Cash => "cash",
            AccountType::Investment => "investment",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checking" => Ok(AccountType::Checking),
            "savings" => Ok(AccountType::Savings),
            "credit" => Ok(AccountType::Credit),
            "cash" => Ok(AccountType::Cash),
            "investment" => Ok(AccountType::Investment),
            other => Err(Error::InvalidOperation(format!(
                "unknown account type \"{other}\""
            ))),
        }
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A named money container owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The owner of the account.
    #[serde(skip)]
    pub user_id: UserID,
    /// The display name, e.g. "Main Checking".
    pub name: String,
    /// What kind of account this is.
    pub account_type: AccountType,
    /// The running total of every transaction applied to the account.
    pub balance: Decimal,
    /// A three letter currency code.
    pub currency: String,
    /// An optional icon name.
    pub icon: String,
    /// Inactive accounts are hidden from the account list.
    pub is_active: bool,
    /// When the account was created.
    #[serde(serialize_with = "serialize_rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to create an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The display name.
    pub name: String,
    /// What kind of account this is.
    pub account_type: AccountType,
    /// The opening balance, may be negative for credit accounts.
    pub balance: Decimal,
    /// A three letter currency code.
    pub currency: String,
    /// An optional icon name.
    pub icon: String,
}

/// Create the account table.
///
/// Balances are stored as integer cents. An update that would overflow or push
/// a balance past [MINOR_UNITS_LIMIT](crate::money::MINOR_UNITS_LIMIT) fails the
/// `balance_in_range` check.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            account_type TEXT NOT NULL
                CHECK (account_type IN ('checking', 'savings', 'credit', 'cash', 'investment')),
            balance INTEGER NOT NULL DEFAULT 0
                CONSTRAINT balance_in_range CHECK (
                    typeof(balance) = 'integer'
                    AND balance > -1000000000000000
                    AND balance < 1000000000000000
                ),
            currency TEXT NOT NULL DEFAULT 'USD',
            icon TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
    )?;

    Ok(())
}

const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, account_type, balance, currency, icon, is_active, created_at";

/// Map a row selected in the column order of [create_account_table] to an account.
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        account_type: row.get(3)?,
        balance: from_minor_units(row.get(4)?),
        currency: row.get(5)?,
        icon: row.get(6)?,
        is_active: row.get(7)?,
        created_at: get_timestamp(row, 8)?,
    })
}

fn validate_currency(currency: &str) -> Result<String, Error> {
    let currency = currency.trim().to_uppercase();

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidOperation(format!(
            "\"{currency}\" is not a three letter currency code"
        )));
    }

    Ok(currency)
}

/// Create an account for `user_id`.
///
/// # Errors
///
/// Returns [Error::InvalidOperation] if the name is blank, the currency is not
/// a three letter code or the balance has more than two decimal places.
pub fn create_account(
    new_account: NewAccount,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = new_account.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidOperation(
            "Account name cannot be empty".to_owned(),
        ));
    }

    let currency = validate_currency(&new_account.currency)?;
    let balance = to_minor_units(new_account.balance)?;
    let created_at = OffsetDateTime::now_utc().unix_timestamp();

    connection
        .prepare(&format!(
            "INSERT INTO account (user_id, name, account_type, balance, currency, icon, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
             RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                name,
                new_account.account_type,
                balance,
                &currency,
                &new_account.icon,
                created_at,
            ),
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// Get the account with `account_id` if it is owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn get_account(
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &account_id), (":user_id", &user_id.as_i64())],
            map_row_to_account,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Account"),
            error => error.into(),
        })
}

/// Get the active accounts owned by `user_id`, oldest first.
pub fn list_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE user_id = :user_id AND is_active = 1 ORDER BY id"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Add `delta` cents to the balance of an account owned by `user_id`.
///
/// The update is relative, so concurrent adjustments are never lost.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user, and [Error::InvalidOperation] if the new balance would be out
/// of range.
pub fn adjust_balance(
    account_id: AccountId,
    delta: i64,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = balance + :delta WHERE id = :id AND user_id = :user_id",
        &[
            (":delta", &delta),
            (":id", &account_id),
            (":user_id", &user_id.as_i64()),
        ],
    )?;

    if rows_affected != 1 {
        return Err(Error::NotFound("Account"));
    }

    Ok(())
}
