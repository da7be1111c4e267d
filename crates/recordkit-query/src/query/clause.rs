//! Clause types shared between the statement builders.

use rusqlite::types::Value;

use crate::{
    expr::{Field, Predicate},
    traits::Expression,
};

/// Sort direction for an ORDER BY clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// An ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: Field,
    pub direction: Direction,
}

impl OrderClause {
    pub fn asc(field: impl Into<Field>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<Field>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    pub(crate) fn to_sql(&self) -> String {
        format!("{} {}", self.field.quoted(), self.direction.as_sql())
    }
}

/// Aggregate function applied by [`Query::to_aggregate_sql`](super::Query::to_aggregate_sql).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// Renders ` WHERE a AND b` (leading space included), or nothing.
pub(crate) fn where_sql(wheres: &[Predicate], params: &mut Vec<Value>) -> String {
    if wheres.is_empty() {
        return String::new();
    }
    let conditions = wheres
        .iter()
        .map(|w| w.to_sql(params))
        .collect::<Vec<_>>();
    format!(" WHERE {}", conditions.join(" AND "))
}
