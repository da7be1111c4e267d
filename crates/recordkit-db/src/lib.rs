pub mod changes;
pub mod connection;
pub mod error;
pub mod helpers;
pub mod record;
pub mod repository;
pub mod traits;
pub mod validation;

pub use changes::Changes;
pub use error::{DbError, Result};
pub use record::DynamicRecord;
pub use repository::{introspect, Repository, SqliteRepository};
pub use traits::{Entity, FromRow, Record};
pub use validation::{Action, FieldError, Saved, ValidationFailure};
