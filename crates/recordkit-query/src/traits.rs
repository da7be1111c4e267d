//! Core trait that powers predicate construction.
//!
//! [`Expression`] is implemented by anything that renders to a SQL fragment:
//! columns ([`Field`], [`Col<T>`](crate::expr::Col)) and compound
//! [`Predicate`]s. Column-like implementors additionally get the comparison
//! constructors (`.eq()`, `.in_()`, `.null()`, ...).

use rusqlite::types::Value;

use crate::expr::{
    column::Field,
    ops::{CmpOp, LogicalOp, Predicate},
};

/// A trait for types that can be converted into SQL expressions.
///
/// When `to_sql` is called, it appends bound parameters to the provided `params` vector
/// and returns the SQL fragment (with `?` placeholders).
///
/// # Example
///
/// ```rust
/// use recordkit_query::expr::Field;
/// use recordkit_query::traits::Expression as _;
///
/// let expr = Field::new("name").eq("User".to_string());
/// let mut params = vec![];
/// let sql = expr.to_sql(&mut params);
/// assert_eq!(sql, "\"name\" = ?");
/// ```
pub trait Expression: Sized {
    /// Converts this expression into a SQL string fragment and appends bound parameters.
    fn to_sql(&self, params: &mut Vec<Value>) -> String;

    /// Creates a SQL `=` condition.
    fn eq<T: Into<Value>>(self, value: T) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::compare(self, CmpOp::Eq, value)
    }

    /// Creates a SQL `!=` condition.
    fn ne<T: Into<Value>>(self, value: T) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::compare(self, CmpOp::Ne, value)
    }

    /// Creates a SQL `>` condition.
    fn gt<T: Into<Value>>(self, value: T) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::compare(self, CmpOp::Gt, value)
    }

    /// Creates a SQL `<` condition.
    fn lt<T: Into<Value>>(self, value: T) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::compare(self, CmpOp::Lt, value)
    }

    /// Creates a SQL `>=` condition.
    fn gte<T: Into<Value>>(self, value: T) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::compare(self, CmpOp::Gte, value)
    }

    /// Creates a SQL `<=` condition.
    fn lte<T: Into<Value>>(self, value: T) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::compare(self, CmpOp::Lte, value)
    }

    /// Creates a SQL `LIKE` condition.
    fn like(self, pattern: impl Into<String>) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::Like {
            field: self.into(),
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    /// Creates a case-insensitive `LIKE` condition.
    fn ilike(self, pattern: impl Into<String>) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::Like {
            field: self.into(),
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    /// Creates a SQL `IN` condition.
    fn in_<T, I>(self, values: I) -> Predicate
    where
        Self: Into<Field>,
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Predicate::In {
            field: self.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// Creates a SQL `NOT IN` condition.
    fn not_in<T, I>(self, values: I) -> Predicate
    where
        Self: Into<Field>,
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Predicate::In {
            field: self.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// Creates a SQL `IS NULL` condition.
    fn null(self) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::Null {
            field: self.into(),
            is_null: true,
        }
    }

    /// Creates a SQL `IS NOT NULL` condition.
    fn not_null(self) -> Predicate
    where
        Self: Into<Field>,
    {
        Predicate::Null {
            field: self.into(),
            is_null: false,
        }
    }

    /// Combines two expressions with `AND`.
    fn and<E: Into<Predicate>>(self, other: E) -> Predicate
    where
        Self: Into<Predicate>,
    {
        Predicate::logical(self, other, LogicalOp::And)
    }

    /// Combines two expressions with `OR`.
    fn or<E: Into<Predicate>>(self, other: E) -> Predicate
    where
        Self: Into<Predicate>,
    {
        Predicate::logical(self, other, LogicalOp::Or)
    }
}
