//! Helpers for storing timestamps as integer unix seconds.

use rusqlite::{Row, types::Type};
use serde::Serializer;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Read a unix timestamp column and convert it to a UTC date-time.
pub fn get_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let seconds: i64 = row.get(index)?;

    OffsetDateTime::from_unix_timestamp(seconds).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

/// Serialize a date-time as an RFC 3339 string, e.g. "2025-01-15T09:30:00Z".
pub fn serialize_rfc3339<S>(date_time: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = date_time
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use serde::Serialize;
    use time::macros::datetime;

    use super::{get_timestamp, serialize_rfc3339};

    #[test]
    fn reads_unix_seconds() {
        let connection = Connection::open_in_memory().unwrap();

        let got = connection
            .query_row("SELECT 1736933400", [], |row| get_timestamp(row, 0))
            .unwrap();

        assert_eq!(got, datetime!(2025-01-15 09:30:00 UTC));
    }

    #[test]
    fn serializes_as_rfc3339() {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "serialize_rfc3339")]
            at: time::OffsetDateTime,
        }

        let json = serde_json::to_string(&Wrapper {
            at: datetime!(2025-01-15 00:00:00 UTC),
        })
        .unwrap();

        assert_eq!(json, r#"{"at":"2025-01-15T00:00:00Z"}"#);
    }
}
