//! The query builder.
//!
//! This module provides a strongly-typed interface for constructing SQL
//! statements without manually concatenating strings. All builders are plain
//! values: they render to a SQL string plus bound parameters and never touch a
//! connection.
//!
//! - [`Query`]: the composed, immutable SELECT description used for fetches,
//!   counts and aggregates.
//! - [`InsertQuery`]: `INSERT INTO ... RETURNING *`.
//! - [`UpdateQuery`]: `UPDATE ... SET ... WHERE ...`.
//! - [`DeleteQuery`]: `DELETE FROM ... WHERE ...`.

pub mod clause;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use clause::{Aggregate, Direction, OrderClause};
pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use select::Query;
pub use update::UpdateQuery;
