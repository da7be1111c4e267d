use rusqlite::types::Value;

use crate::{
    expr::{quote_ident, Predicate},
    query::{clause::where_sql, Query},
};

/// Builds a `DELETE FROM ... WHERE ...` statement.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: String,
    wheres: Vec<Predicate>,
    returning: bool,
}

impl DeleteQuery {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            wheres: Vec::new(),
            returning: false,
        }
    }

    /// Starts a delete scoped by the filters of an existing query.
    pub fn from_query(query: &Query) -> Self {
        Self {
            table: query.table().to_string(),
            wheres: query.predicates().to_vec(),
            returning: false,
        }
    }

    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        self.wheres.push(predicate.into());
        self
    }

    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }

    pub fn is_unconditional(&self) -> bool {
        self.wheres.is_empty()
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", quote_ident(&self.table));
        sql.push_str(&where_sql(&self.wheres, &mut params));

        if self.returning {
            sql.push_str(" RETURNING *");
        }

        (sql, params)
    }
}
