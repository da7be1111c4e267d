//! SQL predicate nodes.
//!
//! A [`Predicate`] is a structural value: it can be compared, cloned and
//! inspected before it is rendered, so two composed queries built from the same
//! inputs are equal. Each variant renders recursively through [`Expression`].

use rusqlite::types::Value;

use crate::{expr::column::Field, traits::Expression};

/// Comparison operator for [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <op> ?`
    Compare {
        field: Field,
        op: CmpOp,
        value: Value,
    },
    /// `field LIKE ?` with the pattern wrapped in `%`.
    Like {
        field: Field,
        pattern: String,
        case_insensitive: bool,
    },
    /// `field [NOT] IN (?, ...)`
    In {
        field: Field,
        values: Vec<Value>,
        negated: bool,
    },
    /// `field IS [NOT] NULL`
    Null { field: Field, is_null: bool },
    /// `(left AND|OR right)`
    Logical {
        left: Box<Predicate>,
        right: Box<Predicate>,
        op: LogicalOp,
    },
}

impl Predicate {
    pub fn compare(field: impl Into<Field>, op: CmpOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn logical(left: impl Into<Predicate>, right: impl Into<Predicate>, op: LogicalOp) -> Self {
        Predicate::Logical {
            left: Box::new(left.into()),
            right: Box::new(right.into()),
            op,
        }
    }

    /// The column the predicate tests, if it tests exactly one.
    pub fn field(&self) -> Option<&Field> {
        match self {
            Predicate::Compare { field, .. }
            | Predicate::Like { field, .. }
            | Predicate::In { field, .. }
            | Predicate::Null { field, .. } => Some(field),
            Predicate::Logical { .. } => None,
        }
    }
}

impl Expression for Predicate {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Compare { field, op, value } => {
                params.push(value.clone());
                format!("{} {} ?", field.quoted(), op.as_sql())
            }
            Predicate::Like {
                field,
                pattern,
                case_insensitive,
            } => {
                params.push(Value::Text(format!("%{}%", pattern)));
                if *case_insensitive {
                    format!("LOWER({}) LIKE LOWER(?)", field.quoted())
                } else {
                    format!("{} LIKE ?", field.quoted())
                }
            }
            Predicate::In {
                field,
                values,
                negated,
            } => {
                // `IN ()` is a syntax error in SQLite
                if values.is_empty() {
                    return if *negated { "1 = 1" } else { "1 = 0" }.to_string();
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().cloned());
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", field.quoted(), op, placeholders)
            }
            Predicate::Null { field, is_null } => {
                let op = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                format!("{} {}", field.quoted(), op)
            }
            Predicate::Logical { left, right, op } => {
                let left_sql = left.to_sql(params);
                let right_sql = right.to_sql(params);
                format!("({} {} {})", left_sql, op.as_sql(), right_sql)
            }
        }
    }
}
