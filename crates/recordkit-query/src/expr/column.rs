//! Column references.
//!
//! [`Field`] is a dynamically named column, as used by loosely-typed
//! conditions and introspected schemas. `Col<T>` ties a column name to a Rust
//! type `T` for entities declared with [`define_entity!`](crate::define_entity).
//! Both implement [`Expression`], so they can be used directly in filters.

use std::{borrow::Cow, fmt, marker::PhantomData};

use rusqlite::types::Value;

use crate::traits::Expression;

/// Quotes an identifier for SQLite, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A reference to a database column by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field(Cow<'static, str>);

impl Field {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The column name quoted for use in a statement.
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_string()))
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&String> for Field {
    fn from(name: &String) -> Self {
        Self(Cow::Owned(name.clone()))
    }
}

impl From<&Field> for Field {
    fn from(field: &Field) -> Self {
        field.clone()
    }
}

impl Expression for Field {
    fn to_sql(&self, _params: &mut Vec<Value>) -> String {
        self.quoted()
    }
}

/// A typed reference to a database column.
///
/// The type parameter `T` indicates the expected Rust type when reading this column,
/// though it is not enforced at runtime; ensure your `FromRow` implementation matches.
///
/// # Example
///
/// ```rust
/// use recordkit_query::expr::Col;
/// const NAME: Col<String> = Col::new("name");
/// ```
pub struct Col<T> {
    pub name: &'static str,
    _type: PhantomData<T>,
}

impl<T> Col<T> {
    /// Creates a new column reference.
    ///
    /// # Parameters
    ///
    /// - `name`: the actual column name in the database (e.g., `"user_name"`)
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub const fn field(&self) -> Field {
        Field::from_static(self.name)
    }
}

// Manual impls so `T` does not need to be `Clone`/`Copy` itself.
impl<T> Clone for Col<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Col<T> {}

impl<T> fmt::Debug for Col<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Col").field(&self.name).finish()
    }
}

impl<T> From<Col<T>> for Field {
    fn from(col: Col<T>) -> Self {
        col.field()
    }
}

impl<T> Expression for Col<T> {
    fn to_sql(&self, _params: &mut Vec<Value>) -> String {
        quote_ident(self.name)
    }
}
