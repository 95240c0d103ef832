//! Database operations for tags.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    tag::{Tag, TagName},
};

/// Create the tag table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_tag_user ON tag(user_id);",
    )?;

    Ok(())
}

/// Create a tag owned by `user_id` and return it with its generated ID.
pub fn create_tag(name: TagName, user_id: UserID, connection: &Connection) -> Result<Tag, Error> {
    connection.execute(
        "INSERT INTO tag (user_id, name) VALUES (?1, ?2)",
        (user_id.as_i64(), name.as_ref()),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Tag { id, name })
}

/// Retrieve the tags owned by `user_id` ordered alphabetically by name.
pub fn get_all_tags(user_id: UserID, connection: &Connection) -> Result<Vec<Tag>, Error> {
    connection
        .prepare("SELECT id, name FROM tag WHERE user_id = :user_id ORDER BY name ASC, id ASC")?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the tags of a transaction, ordered alphabetically by name.
pub fn get_transaction_tags(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Tag>, Error> {
    connection
        .prepare(
            "SELECT tag.id, tag.name FROM tag
             INNER JOIN transaction_tag ON transaction_tag.tag_id = tag.id
             WHERE transaction_tag.transaction_id = :transaction_id AND tag.user_id = :user_id
             ORDER BY tag.name ASC, tag.id ASC",
        )?
        .query_map(
            &[
                (":transaction_id", &transaction_id),
                (":user_id", &user_id.as_i64()),
            ],
            map_row,
        )?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

/// Map a database row of `id, name` to a [Tag].
pub fn map_row(row: &Row) -> Result<Tag, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;

    Ok(Tag {
        id,
        name: TagName::new_unchecked(&raw_name),
    })
}

#[cfg(test)]
mod tag_db_tests {
    use rusqlite::Connection;

    use crate::{auth::test_utils::insert_test_user, db::initialize};

    use super::{TagName, create_tag, get_all_tags};

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    #[test]
    fn create_tag_succeeds() {
        let connection = get_db_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let name = TagName::new("Groceries").unwrap();

        let tag = create_tag(name.clone(), user.id, &connection).unwrap();

        assert!(tag.id > 0);
        assert_eq!(tag.name, name);
    }

    #[test]
    fn get_all_tags_is_sorted_and_scoped_to_owner() {
        let connection = get_db_connection();
        let owner = insert_test_user("owner@bar.baz", &connection);
        let other = insert_test_user("other@bar.baz", &connection);
        let rent = create_tag(TagName::new_unchecked("Rent"), owner.id, &connection).unwrap();
        let bills = create_tag(TagName::new_unchecked("Bills"), owner.id, &connection).unwrap();
        create_tag(TagName::new_unchecked("Theirs"), other.id, &connection).unwrap();

        let tags = get_all_tags(owner.id, &connection).unwrap();

        assert_eq!(tags, vec![bills, rent]);
    }
}
