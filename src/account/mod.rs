//! Financial accounts: creation, lookup and relative balance updates.

mod core;
mod create_endpoint;
mod get_endpoint;

pub use core::{
    Account, AccountType, DEFAULT_CURRENCY, NewAccount, adjust_balance, create_account,
    create_account_table, get_account, list_accounts, map_row_to_account,
};
pub use create_endpoint::{AccountState, create_account_endpoint};
pub use get_endpoint::{get_account_endpoint, list_accounts_endpoint};

#[cfg(test)]
pub(crate) use core::test_utils;
