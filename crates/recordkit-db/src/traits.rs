//! Traits implemented by record types.
//!
//! - [`FromRow`] converts a database row into a Rust value.
//! - [`Record`] exposes field values by name and hooks for validation and preloading.
//! - [`Entity`] ties a record type to its statically declared [`Schema`].

use recordkit_query::{Schema, Value};
use rusqlite::Row;

use crate::{
    changes::Changes,
    record::DynamicRecord,
    validation::{Action, ValidationFailure},
};

/// A trait for converting a database row into a Rust type.
///
/// # Example
///
/// ```rust
/// use recordkit_db::FromRow;
/// use rusqlite::Row;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> rusqlite::Result<Self> {
///         Ok(Self {
///             id: row.get("id")?,
///             name: row.get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// A row-backed value the repository can read, write and preload into.
pub trait Record: FromRow {
    /// Current value of the column `name`, or `None` if the record has no such column.
    fn field(&self, name: &str) -> Option<Value>;

    /// Checks `changes` before an insert, update or delete is issued.
    ///
    /// A failure is returned to the caller as-is and no statement runs.
    fn validate(_changes: &Changes, _action: Action) -> Result<(), ValidationFailure> {
        Ok(())
    }

    /// Receives the rows loaded for the association `name`.
    ///
    /// Records that declare no associations can keep the default, which drops them.
    fn attach(&mut self, _name: &str, _records: Vec<DynamicRecord>) {}
}

/// A record type with a schema known at compile time.
pub trait Entity: Record {
    fn schema() -> Schema;
}
