//! Read-only queries over the ledger: filtered listings and spending summaries.

use std::collections::HashMap;

use rusqlite::{Connection, named_params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{Account, get_account},
    auth::UserID,
    category::{Category, get_category},
    database_id::{AccountId, CategoryId, TransactionId},
    money::{sum_from_minor_units, to_minor_units},
    tag::{Tag, get_transaction_tags},
    timestamp::serialize_rfc3339,
    transaction::core::{
        TRANSACTION_COLUMNS, Transaction, TransactionType, get_transaction, map_transaction_row,
    },
};

/// Optional filters for listing transactions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionFilter {
    /// Only transactions of this type.
    pub transaction_type: Option<TransactionType>,
    /// Only transactions whose source account is this account.
    pub account_id: Option<AccountId>,
    /// Only transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only transactions on or after this date.
    pub date_from: Option<Date>,
    /// Only transactions on or before this date.
    pub date_to: Option<Date>,
}

/// An inclusive date range where either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct DateRange {
    /// The first day included.
    pub date_from: Option<Date>,
    /// The last day included.
    pub date_to: Option<Date>,
}

/// A transaction with its accounts, category and tags resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetail {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// What the transaction did to its accounts.
    pub transaction_type: TransactionType,
    /// Always positive.
    pub amount: Decimal,
    /// The source account.
    pub account: Account,
    /// The destination of a transfer.
    pub to_account: Option<Account>,
    /// `None` for transfers, or if the category was deleted.
    pub category: Option<Category>,
    /// A free-form description.
    pub note: String,
    /// The day the money moved.
    pub date: Date,
    /// The tags attached to the transaction.
    pub tags: Vec<Tag>,
    /// When the transaction was recorded.
    #[serde(serialize_with = "serialize_rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The total spent in one expense category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    /// The ID of the category.
    pub category_id: CategoryId,
    /// The name of the category.
    pub category_name: String,
    /// The icon of the category.
    pub category_icon: String,
    /// The sum of the expenses in the category.
    pub total: Decimal,
}

/// The expenses in one category along with their total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTransactions {
    /// The ID of the category.
    pub category_id: CategoryId,
    /// The name of the category.
    pub category_name: String,
    /// The icon of the category.
    pub category_icon: String,
    /// The sum of the expenses in the category.
    pub total: Decimal,
    /// The expenses in the category, newest first.
    pub transactions: Vec<TransactionDetail>,
}

/// Resolves the accounts and categories of transactions, caching each row so
/// that a listing looks every account up once.
struct DetailLoader<'a> {
    user_id: UserID,
    connection: &'a Connection,
    accounts: HashMap<AccountId, Account>,
    categories: HashMap<CategoryId, Category>,
}

impl<'a> DetailLoader<'a> {
    fn new(user_id: UserID, connection: &'a Connection) -> Self {
        Self {
            user_id,
            connection,
            accounts: HashMap::new(),
            categories: HashMap::new(),
        }
    }

    fn account(&mut self, account_id: AccountId) -> Result<Account, Error> {
        if let Some(account) = self.accounts.get(&account_id) {
            return Ok(account.clone());
        }

        let account = get_account(account_id, self.user_id, self.connection)?;
        self.accounts.insert(account_id, account.clone());

        Ok(account)
    }

    fn category(&mut self, category_id: CategoryId) -> Result<Category, Error> {
        if let Some(category) = self.categories.get(&category_id) {
            return Ok(category.clone());
        }

        let category = get_category(category_id, self.user_id, self.connection)?;
        self.categories.insert(category_id, category.clone());

        Ok(category)
    }

    fn load(&mut self, transaction: Transaction) -> Result<TransactionDetail, Error> {
        let account = self.account(transaction.account_id)?;
        let to_account = transaction
            .to_account_id
            .map(|account_id| self.account(account_id))
            .transpose()?;
        let category = transaction
            .category_id
            .map(|category_id| self.category(category_id))
            .transpose()?;
        let tags = get_transaction_tags(transaction.id, self.user_id, self.connection)?;

        Ok(TransactionDetail {
            id: transaction.id,
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            account,
            to_account,
            category,
            note: transaction.note,
            date: transaction.date,
            tags,
            created_at: transaction.created_at,
        })
    }
}

fn select_transactions(
    filter: &TransactionFilter,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE user_id = :user_id
               AND (:transaction_type IS NULL OR transaction_type = :transaction_type)
               AND (:account_id IS NULL OR account_id = :account_id)
               AND (:category_id IS NULL OR category_id = :category_id)
               AND (:date_from IS NULL OR date >= :date_from)
               AND (:date_to IS NULL OR date <= :date_to)
             ORDER BY date DESC, created_at DESC, id DESC"
        ))?
        .query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":transaction_type": filter.transaction_type,
                ":account_id": filter.account_id,
                ":category_id": filter.category_id,
                ":date_from": filter.date_from,
                ":date_to": filter.date_to,
            },
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// List the transactions owned by `user_id` that match `filter`, newest first.
///
/// Transactions on the same day are ordered by when they were recorded, newest first.
pub fn list_transactions(
    filter: &TransactionFilter,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionDetail>, Error> {
    let mut loader = DetailLoader::new(user_id, connection);

    select_transactions(filter, user_id, connection)?
        .into_iter()
        .map(|transaction| loader.load(transaction))
        .collect()
}

/// Get a single transaction owned by `user_id` with its details resolved.
///
/// # Errors
///
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn get_transaction_detail(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<TransactionDetail, Error> {
    let transaction = get_transaction(transaction_id, user_id, connection)?;

    DetailLoader::new(user_id, connection).load(transaction)
}

/// Sum the expenses of `user_id` per category, largest total first.
///
/// Expenses without a category are left out. Totals are summed in 128 bits so a
/// category can hold more than `i64::MAX` cents.
pub fn spending_by_category(
    range: DateRange,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<CategorySpending>, Error> {
    let mut statement = connection.prepare(
        "SELECT category.id, category.name, category.icon, t.amount
         FROM \"transaction\" AS t
         INNER JOIN category ON category.id = t.category_id
         WHERE t.user_id = :user_id
           AND category.user_id = :user_id
           AND t.transaction_type = 'expense'
           AND (:date_from IS NULL OR t.date >= :date_from)
           AND (:date_to IS NULL OR t.date <= :date_to)
         ORDER BY category.id ASC",
    )?;
    let rows = statement.query_map(
        named_params! {
            ":user_id": user_id.as_i64(),
            ":date_from": range.date_from,
            ":date_to": range.date_to,
        },
        |row| {
            Ok((
                row.get::<_, CategoryId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    let mut groups: Vec<(i128, CategorySpending)> = Vec::new();

    for row in rows {
        let (category_id, category_name, category_icon, cents) = row?;

        match groups.last_mut() {
            Some((total, spending)) if spending.category_id == category_id => {
                *total += i128::from(cents);
            }
            _ => groups.push((
                i128::from(cents),
                CategorySpending {
                    category_id,
                    category_name,
                    category_icon,
                    total: Decimal::ZERO,
                },
            )),
        }
    }

    // Stable, so equal totals stay in category ID order.
    groups.sort_by(|(left, _), (right, _)| right.cmp(left));

    groups
        .into_iter()
        .map(|(total, mut spending)| -> Result<CategorySpending, Error> {
            spending.total = sum_from_minor_units(total)?;
            Ok(spending)
        })
        .collect()
}

/// Group the expenses of `user_id` by category, largest total first.
///
/// Groups with the same total keep the order of their newest expense.
/// Expenses without a category are left out.
pub fn transactions_by_category(
    range: DateRange,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<CategoryTransactions>, Error> {
    let filter = TransactionFilter {
        transaction_type: Some(TransactionType::Expense),
        date_from: range.date_from,
        date_to: range.date_to,
        ..Default::default()
    };
    let expenses = list_transactions(&filter, user_id, connection)?;

    let mut groups: Vec<(i128, CategoryTransactions)> = Vec::new();
    let mut group_index: HashMap<CategoryId, usize> = HashMap::new();

    for expense in expenses {
        let Some(category) = expense.category.as_ref() else {
            continue;
        };
        let cents = to_minor_units(expense.amount)?;

        let index = *group_index.entry(category.id).or_insert_with(|| {
            groups.push((
                0,
                CategoryTransactions {
                    category_id: category.id,
                    category_name: category.name.clone(),
                    category_icon: category.icon.clone(),
                    total: Decimal::ZERO,
                    transactions: Vec::new(),
                },
            ));
            groups.len() - 1
        });

        let (total, group) = &mut groups[index];
        *total += i128::from(cents);
        group.transactions.push(expense);
    }

    groups.sort_by(|(left, _), (right, _)| right.cmp(left));

    groups
        .into_iter()
        .map(|(total, mut group)| -> Result<CategoryTransactions, Error> {
            group.total = sum_from_minor_units(total)?;
            Ok(group)
        })
        .collect()
}

#[cfg(test)]
mod query_tests {
    use std::str::FromStr;

    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::{Date, macros::date};

    use crate::{
        Error,
        account::test_utils::insert_test_account,
        auth::test_utils::insert_test_user,
        category::{CategoryType, test_utils::insert_test_category},
        db::initialize,
        tag::{TagName, create_tag},
        transaction::{
            core::TransactionType,
            ledger::{LedgerEntry, record_expense, record_income, record_transfer},
        },
    };

    use super::{
        DateRange, TransactionFilter, get_transaction_detail, list_transactions,
        spending_by_category, transactions_by_category,
    };

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn entry(amount: &str, date: Date) -> LedgerEntry {
        LedgerEntry {
            amount: Decimal::from_str(amount).unwrap(),
            date,
            note: String::new(),
            tag_ids: Vec::new(),
        }
    }

    #[test]
    fn list_is_newest_first_and_filterable() {
        let mut connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", user.id, &connection);
        let savings = insert_test_account("Savings", "0.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
        let wages = insert_test_category("Wages", CategoryType::Income, user.id, &connection);

        let old = record_expense(
            main.id,
            food.id,
            entry("5", date!(2025 - 01 - 01)),
            user.id,
            &mut connection,
        )
        .unwrap();
        let paid = record_income(
            main.id,
            wages.id,
            entry("100", date!(2025 - 01 - 10)),
            user.id,
            &mut connection,
        )
        .unwrap();
        let moved = record_transfer(
            main.id,
            savings.id,
            entry("50", date!(2025 - 01 - 20)),
            user.id,
            &mut connection,
        )
        .unwrap();

        let all = list_transactions(&TransactionFilter::default(), user.id, &connection).unwrap();
        let ids: Vec<_> = all.iter().map(|detail| detail.id).collect();
        assert_eq!(ids, vec![moved.id, paid.id, old.id]);

        let incomes = list_transactions(
            &TransactionFilter {
                transaction_type: Some(TransactionType::Income),
                ..Default::default()
            },
            user.id,
            &connection,
        )
        .unwrap();
        assert_eq!(incomes.len(), 1);
        assert_eq!(incomes[0].id, paid.id);

        let in_range = list_transactions(
            &TransactionFilter {
                date_from: Some(date!(2025 - 01 - 05)),
                date_to: Some(date!(2025 - 01 - 10)),
                ..Default::default()
            },
            user.id,
            &connection,
        )
        .unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].id, paid.id);

        let by_category = list_transactions(
            &TransactionFilter {
                category_id: Some(food.id),
                account_id: Some(main.id),
                ..Default::default()
            },
            user.id,
            &connection,
        )
        .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].id, old.id);
    }

    #[test]
    fn same_day_transactions_are_newest_recorded_first() {
        let mut connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
        let day = date!(2025 - 03 - 03);

        let first =
            record_expense(main.id, food.id, entry("1", day), user.id, &mut connection).unwrap();
        let second =
            record_expense(main.id, food.id, entry("2", day), user.id, &mut connection).unwrap();

        let all = list_transactions(&TransactionFilter::default(), user.id, &connection).unwrap();
        let ids: Vec<_> = all.iter().map(|detail| detail.id).collect();

        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn list_never_shows_other_users_transactions() {
        let mut connection = get_db_connection();
        let owner = insert_test_user("owner@bar.baz", &connection);
        let other = insert_test_user("other@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", owner.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, owner.id, &connection);
        let expense = record_expense(
            main.id,
            food.id,
            entry("5", date!(2025 - 01 - 01)),
            owner.id,
            &mut connection,
        )
        .unwrap();

        assert_eq!(
            list_transactions(&TransactionFilter::default(), other.id, &connection),
            Ok(Vec::new())
        );
        assert_eq!(
            get_transaction_detail(expense.id, other.id, &connection),
            Err(Error::NotFound("Transaction"))
        );
        assert_eq!(
            spending_by_category(DateRange::default(), other.id, &connection),
            Ok(Vec::new())
        );
    }

    #[test]
    fn detail_resolves_accounts_category_and_tags() {
        let mut connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", user.id, &connection);
        let savings = insert_test_account("Savings", "0.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
        let weekly = create_tag(TagName::new_unchecked("Weekly"), user.id, &connection).unwrap();
        let mut tagged = entry("12.50", date!(2025 - 01 - 01));
        tagged.tag_ids = vec![weekly.id];
        tagged.note = "Lunch".to_owned();

        let expense = record_expense(main.id, food.id, tagged, user.id, &mut connection).unwrap();
        let transfer = record_transfer(
            main.id,
            savings.id,
            entry("100", date!(2025 - 01 - 02)),
            user.id,
            &mut connection,
        )
        .unwrap();

        let expense_detail = get_transaction_detail(expense.id, user.id, &connection).unwrap();
        assert_eq!(expense_detail.account.id, main.id);
        assert_eq!(expense_detail.to_account, None);
        assert_eq!(expense_detail.category, Some(food));
        assert_eq!(expense_detail.tags, vec![weekly]);
        assert_eq!(expense_detail.note, "Lunch");
        assert_eq!(expense_detail.amount.to_string(), "12.50");

        let transfer_detail = get_transaction_detail(transfer.id, user.id, &connection).unwrap();
        assert_eq!(transfer_detail.category, None);
        assert_eq!(
            transfer_detail.to_account.map(|account| account.id),
            Some(savings.id)
        );
    }

    #[test]
    fn spending_sums_expenses_per_category() {
        let mut connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
        let rent = insert_test_category("Rent", CategoryType::Expense, user.id, &connection);
        let wages = insert_test_category("Wages", CategoryType::Income, user.id, &connection);
        let day = date!(2025 - 02 - 01);

        for amount in ["10.25", "4.75"] {
            record_expense(main.id, food.id, entry(amount, day), user.id, &mut connection)
                .unwrap();
        }
        record_expense(main.id, rent.id, entry("300", day), user.id, &mut connection).unwrap();
        record_income(main.id, wages.id, entry("999", day), user.id, &mut connection).unwrap();
        record_expense(
            main.id,
            rent.id,
            entry("300", date!(2024 - 12 - 01)),
            user.id,
            &mut connection,
        )
        .unwrap();

        let spending = spending_by_category(
            DateRange {
                date_from: Some(date!(2025 - 01 - 01)),
                date_to: None,
            },
            user.id,
            &connection,
        )
        .unwrap();

        let summary: Vec<_> = spending
            .iter()
            .map(|row| (row.category_name.as_str(), row.total.to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![("Rent", "300.00".to_owned()), ("Food", "15.00".to_owned())]
        );
    }

    #[test]
    fn transactions_are_grouped_by_category() {
        let mut connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
        let fun = insert_test_category("Fun", CategoryType::Expense, user.id, &connection);

        let lunch = record_expense(
            main.id,
            food.id,
            entry("8", date!(2025 - 02 - 01)),
            user.id,
            &mut connection,
        )
        .unwrap();
        let dinner = record_expense(
            main.id,
            food.id,
            entry("30", date!(2025 - 02 - 02)),
            user.id,
            &mut connection,
        )
        .unwrap();
        let movie = record_expense(
            main.id,
            fun.id,
            entry("20", date!(2025 - 02 - 03)),
            user.id,
            &mut connection,
        )
        .unwrap();

        let groups = transactions_by_category(DateRange::default(), user.id, &connection).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category_id, food.id);
        assert_eq!(groups[0].total.to_string(), "38.00");
        let food_ids: Vec<_> = groups[0].transactions.iter().map(|t| t.id).collect();
        assert_eq!(food_ids, vec![dinner.id, lunch.id]);
        assert_eq!(groups[1].category_id, fun.id);
        assert_eq!(groups[1].transactions[0].id, movie.id);
    }

    #[test]
    fn expenses_without_a_category_are_left_out_of_summaries() {
        let mut connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "1000.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);
        let expense = record_expense(
            main.id,
            food.id,
            entry("25", date!(2025 - 02 - 01)),
            user.id,
            &mut connection,
        )
        .unwrap();

        connection
            .execute("DELETE FROM category WHERE id = ?1", (food.id,))
            .unwrap();

        assert_eq!(
            spending_by_category(DateRange::default(), user.id, &connection),
            Ok(Vec::new())
        );
        assert_eq!(
            transactions_by_category(DateRange::default(), user.id, &connection),
            Ok(Vec::new())
        );
        let detail = get_transaction_detail(expense.id, user.id, &connection).unwrap();
        assert_eq!(detail.category, None);
    }

    #[test]
    fn category_totals_can_exceed_64_bits() {
        let connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let main = insert_test_account("Main", "0.00", user.id, &connection);
        let food = insert_test_category("Food", CategoryType::Expense, user.id, &connection);

        // Ten thousand of the largest allowed amounts add up to more than i64::MAX cents.
        connection
            .execute(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 10000)
                 INSERT INTO \"transaction\"
                    (user_id, transaction_type, amount, account_id, category_id, date, created_at)
                 SELECT ?1, 'expense', 999999999999999, ?2, ?3, '2025-02-01', 0 FROM n",
                (user.id.as_i64(), main.id, food.id),
            )
            .unwrap();
        let expected = "99999999999999900.00";

        let spending = spending_by_category(DateRange::default(), user.id, &connection).unwrap();
        assert_eq!(spending.len(), 1);
        assert_eq!(spending[0].total.to_string(), expected);

        let groups = transactions_by_category(DateRange::default(), user.id, &connection).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total.to_string(), expected);
        assert_eq!(groups[0].transactions.len(), 10_000);
    }
}
