//! Tag management for labelling transactions.

mod create;
mod db;
mod domain;
mod list;

pub use create::{TagState, create_tag_endpoint};
pub use db::{create_tag, create_tag_table, get_all_tags, get_transaction_tags};
pub use domain::{Tag, TagName};
pub use list::list_tags_endpoint;
