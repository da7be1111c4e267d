use rusqlite::types::Value;

use crate::{
    expr::{quote_ident, Field, Predicate},
    query::{clause::where_sql, Query},
};

/// Builds an `UPDATE ... SET ... WHERE ...` statement.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: String,
    updates: Vec<(Field, Value)>,
    wheres: Vec<Predicate>,
    returning: bool,
}

impl UpdateQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            updates: vec![],
            wheres: vec![],
            returning: false,
        }
    }

    /// Starts an update scoped by the filters of an existing query.
    ///
    /// Ordering, paging and preloads of `query` do not apply to updates.
    pub fn from_query(query: &Query) -> Self {
        Self {
            table: query.table().to_string(),
            updates: vec![],
            wheres: query.predicates().to_vec(),
            returning: false,
        }
    }

    pub fn set(mut self, col: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.updates.push((col.into(), value.into()));
        self
    }

    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        self.wheres.push(predicate.into());
        self
    }

    /// Appends `RETURNING *` so updated rows come back.
    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }

    pub fn has_updates(&self) -> bool {
        !self.updates.is_empty()
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();

        let sets: Vec<String> = self
            .updates
            .iter()
            .map(|(col, val)| {
                params.push(val.clone());
                format!("{} = ?", col.quoted())
            })
            .collect();

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(&self.table),
            sets.join(", ")
        );
        sql.push_str(&where_sql(&self.wheres, &mut params));

        if self.returning {
            sql.push_str(" RETURNING *");
        }

        (sql, params)
    }
}
