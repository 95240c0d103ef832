//! Core tag domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::TagId};

/// A validated, non-blank tag name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a tag name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidOperation] if `name` is blank.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::InvalidOperation("Tag name cannot be empty".to_owned()))
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a tag name without validation.
    ///
    /// The caller should ensure that the string is not blank.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TagName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A free-form label attached to transactions (e.g., 'Rent', 'Holiday').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Hash)]
pub struct Tag {
    /// The id of the tag.
    pub id: TagId,
    /// The name of the tag.
    pub name: TagName,
}

#[cfg(test)]
mod tag_name_tests {
    use crate::Error;

    use super::TagName;

    #[test]
    fn new_trims_whitespace() {
        assert_eq!(TagName::new("  Rent ").unwrap().as_ref(), "Rent");
    }

    #[test]
    fn new_fails_on_blank_name() {
        assert!(matches!(TagName::new(" \t"), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn deserialize_rejects_blank_name() {
        assert!(serde_json::from_str::<TagName>("\"\"").is_err());
    }
}
