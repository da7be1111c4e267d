//! The repository capability.
//!
//! [`Repository`] executes composed [`Query`] values and write statements
//! against a store. [`SqliteRepository`] is the rusqlite-backed implementation.

mod introspect;
mod preload;
mod sqlite;

use recordkit_query::{Aggregate, Field, Query, Value};

pub use introspect::introspect;
pub use sqlite::SqliteRepository;

use crate::{changes::Changes, error::DbError, validation::Saved, Record, Result};

pub trait Repository {
    /// Every row matched by `query`, with its preloads attached.
    fn fetch_all<R: Record>(&self, query: &Query) -> Result<Vec<R>>;

    /// The first row matched by `query`.
    fn fetch_one<R: Record>(&self, query: &Query) -> Result<Option<R>>;

    /// Inserts a row built from `changes` and returns it as stored.
    fn insert<R: Record>(&self, table: &str, changes: &Changes) -> Result<Saved<R>>;

    /// Applies `changes` to the row selected by `target` and returns it as stored.
    ///
    /// # Errors
    ///
    /// [`DbError::NotFound`] when `target` matches no row.
    fn update<R: Record>(&self, target: &Query, changes: &Changes) -> Result<Saved<R>>;

    /// Deletes the row selected by `target` and returns it as it was.
    ///
    /// # Errors
    ///
    /// [`DbError::NotFound`] when `target` matches no row.
    fn delete<R: Record>(&self, target: &Query) -> Result<Saved<R>>;

    /// Applies `changes` to every row matched by `query`. Returns the affected row count.
    fn update_all(&self, query: &Query, changes: &Changes) -> Result<usize>;

    /// Deletes every row matched by `query`. Returns the affected row count.
    fn delete_all(&self, query: &Query) -> Result<usize>;

    /// Evaluates `function` over the rows matched by `query`.
    ///
    /// `None` when the result is SQL `NULL` (e.g. `SUM` over no rows).
    fn aggregate(
        &self,
        query: &Query,
        function: Aggregate,
        field: Option<&Field>,
    ) -> Result<Option<Value>>;

    /// Runs `f` in a transaction, committing on `Ok` and rolling back on `Err`.
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&Self) -> std::result::Result<T, E>;
}
