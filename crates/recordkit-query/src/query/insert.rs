use rusqlite::types::Value;

use crate::expr::{quote_ident, Field};

/// Builds an `INSERT INTO ... RETURNING *` statement.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    columns: Vec<Field>,
    values: Vec<Value>,
}

impl InsertQuery {
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            values: vec![],
        }
    }

    pub fn set(mut self, col: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.columns.push(col.into());
        self.values.push(value.into());
        self
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        let mut sql = if self.columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&self.table))
        } else {
            let columns = self
                .columns
                .iter()
                .map(Field::quoted)
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; self.values.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&self.table),
                columns,
                placeholders
            )
        };

        sql.push_str(" RETURNING *");
        (sql, self.values.clone())
    }
}
