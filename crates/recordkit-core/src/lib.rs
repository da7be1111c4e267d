//! ActiveRecord-style helpers over the recordkit query builder and repository.
//!
//! - [`compiler`] turns a [`Condition`] plus options into a composed query.
//! - [`batch`] walks a primary-key range in bounded pages.
//! - [`Model`] composes both with a [`Repository`](recordkit_db::Repository)
//!   into `find`, `filter`, `create`, `paginate`, `find_each` and friends.

pub mod batch;
pub mod compiler;
pub mod condition;
pub mod error;
pub mod model;
pub mod options;
pub mod page;

pub use batch::{BatchCursor, Batches, Records};
pub use compiler::{compile, compile_with};
pub use condition::{Condition, FilterValue};
pub use error::{Error, Result};
pub use model::Model;
pub use options::{
    AllOptions, AllowList, BatchOptions, FilterOptions, FindOptions, OptionsBag, QueryOptions,
};
pub use page::Page;
