//! This file defines the `Category` type, the functions for storing categories and the API routes for the category type.
//! A category classifies a transaction as a kind of expense or income, e.g. 'Groceries' or 'Wages'.

use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    http::StatusCode,
};
use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, auth::UserID, database_id::CategoryId, db::lock_connection};

/// Whether a category is used for expenses or income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// Money spent.
    #[default]
    Expense,
    /// Money received.
    Income,
}

impl CategoryType {
    /// The name stored in the database and used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "expense",
            CategoryType::Income => "income",
        }
    }
}

impl Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(CategoryType::Expense),
            "income" => Ok(CategoryType::Income),
            other => Err(Error::InvalidOperation(format!(
                "unknown category type \"{other}\""
            ))),
        }
    }
}

impl ToSql for CategoryType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CategoryType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A category for expenses or income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// The id of the category.
    pub id: CategoryId,
    /// The name of the category.
    pub name: String,
    /// An optional icon name.
    pub icon: String,
    /// Whether the category is for expenses or income.
    pub category_type: CategoryType,
}

/// Create the category table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            icon TEXT NOT NULL DEFAULT '',
            category_type TEXT NOT NULL DEFAULT 'expense'
                CHECK (category_type IN ('expense', 'income')),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Map a row of `id, name, icon, category_type` to a category.
pub fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        category_type: row.get(3)?,
    })
}

/// Create a category owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::InvalidOperation] if `name` is blank.
pub fn create_category(
    name: &str,
    icon: &str,
    category_type: CategoryType,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidOperation(
            "Category name cannot be empty".to_owned(),
        ));
    }

    connection
        .prepare(
            "INSERT INTO category (user_id, name, icon, category_type) VALUES (?1, ?2, ?3, ?4)
             RETURNING id, name, icon, category_type",
        )?
        .query_row(
            (user_id.as_i64(), name, icon, category_type),
            map_row_to_category,
        )
        .map_err(Error::from)
}

/// Get a category owned by `user_id` that has the type `category_type`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist, belongs to
/// another user or has a different type.
pub fn get_category_of_type(
    category_id: CategoryId,
    category_type: CategoryType,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, icon, category_type FROM category
             WHERE id = ?1 AND user_id = ?2 AND category_type = ?3",
        )?
        .query_row(
            (category_id, user_id.as_i64(), category_type),
            map_row_to_category,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Category"),
            error => error.into(),
        })
}

/// Get a category owned by `user_id` regardless of its type.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist or belongs to
/// another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, icon, category_type FROM category WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((category_id, user_id.as_i64()), map_row_to_category)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Category"),
            error => error.into(),
        })
}

/// List the categories owned by `user_id`, optionally only those of `category_type`.
pub fn list_categories(
    category_type: Option<CategoryType>,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, icon, category_type FROM category
             WHERE user_id = ?1 AND (?2 IS NULL OR category_type = ?2)
             ORDER BY id",
        )?
        .query_map((user_id.as_i64(), category_type), map_row_to_category)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// The state needed for creating and listing categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    /// The name of the category.
    pub name: String,
    /// An optional icon name.
    #[serde(default)]
    pub icon: String,
    /// Defaults to expense.
    #[serde(default)]
    pub category_type: CategoryType,
}

/// The query parameters for listing categories.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    /// Only list categories of this type.
    pub category_type: Option<CategoryType>,
}

/// Handler for creating a category owned by the acting user.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(
        &request.name,
        &request.icon,
        request.category_type,
        user_id,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for listing the acting user's categories.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_categories(query.category_type, user_id, &connection).map(Json)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use rusqlite::Connection;

    use crate::auth::UserID;

    use super::{Category, CategoryType, create_category};

    /// Create a category without an icon.
    pub fn insert_test_category(
        name: &str,
        category_type: CategoryType,
        user_id: UserID,
        connection: &Connection,
    ) -> Category {
        create_category(name, "", category_type, user_id, connection)
            .expect("Could not create test category")
    }
}
