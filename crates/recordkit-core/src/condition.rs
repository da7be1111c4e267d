//! Caller-supplied selection criteria.

use recordkit_db::Changes;
use recordkit_query::{Field, Query, Value};

/// A single column constraint inside [`Condition::Filters`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// `field = value`
    Scalar(Value),
    /// `field IN (values)`; an empty set matches nothing.
    Set(Vec<Value>),
    /// `field IS NULL`
    Null,
}

/// What to select, decided by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Condition {
    /// No restriction.
    #[default]
    Empty,
    /// Column constraints, AND-ed in the order given.
    Filters(Vec<(Field, FilterValue)>),
    /// A query built elsewhere. It replaces the record type's base query.
    Prebuilt(Query),
}

impl Condition {
    /// Adds `field = value`, turning `Empty` into `Filters`.
    pub fn equals(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.push(field.into(), FilterValue::Scalar(value.into()))
    }

    /// Adds `field IN (values)`.
    pub fn any_of<T, I>(self, field: impl Into<Field>, values: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(field.into(), FilterValue::Set(values))
    }

    /// Adds `field IS NULL`.
    pub fn is_null(self, field: impl Into<Field>) -> Self {
        self.push(field.into(), FilterValue::Null)
    }

    fn push(self, field: Field, value: FilterValue) -> Self {
        match self {
            Condition::Empty => Condition::Filters(vec![(field, value)]),
            Condition::Filters(mut filters) => {
                filters.push((field, value));
                Condition::Filters(filters)
            }
            Condition::Prebuilt(query) => Condition::Prebuilt(apply_filter(query, field, value)),
        }
    }
}

/// Narrows `query` by one column constraint.
pub(crate) fn apply_filter(query: Query, field: Field, value: FilterValue) -> Query {
    match value {
        FilterValue::Set(values) => query.with_membership_filter(field, values),
        FilterValue::Null => query.with_null_filter(field),
        FilterValue::Scalar(value) => query.with_equality_filter(field, value),
    }
}

impl From<Query> for Condition {
    fn from(query: Query) -> Self {
        Condition::Prebuilt(query)
    }
}

/// Equality on every assigned column; a `NULL` assignment becomes `IS NULL`.
impl From<&Changes> for Condition {
    fn from(changes: &Changes) -> Self {
        changes
            .iter()
            .fold(Condition::Empty, |condition, (field, value)| match value {
                Value::Null => condition.is_null(field),
                value => condition.equals(field, value.clone()),
            })
    }
}
