use recordkit_query::{Association, Schema};
use rusqlite::Connection;

use crate::{error::DbError, Result};

/// Builds a [`Schema`] for `table` from the database catalogue.
///
/// Columns and primary keys come from `table_info`. Every foreign key declared
/// by `table` becomes a belongs-to association named after the column without
/// its `_id` suffix; every foreign key in another table pointing at `table`
/// becomes a has-many association named after that table.
pub fn introspect(conn: &Connection, table: &str) -> Result<Schema> {
    let mut stmt =
        conn.prepare("SELECT name, pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if columns.is_empty() {
        return Err(DbError::NotFound(format!("table `{}`", table)));
    }

    let mut schema = Schema::new(table);
    for (name, pk) in columns {
        schema = if pk > 0 {
            schema.with_primary_key(name)
        } else {
            schema.with_field(name)
        };
    }

    for (target, from, to) in foreign_keys(conn, table)? {
        let name = from.strip_suffix("_id").unwrap_or(&target).to_string();
        schema = schema.with_association(
            Association::belongs_to(name, target, from).references(to.unwrap_or_else(|| "id".into())),
        );
    }

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for other in tables.into_iter().filter(|t| t != table) {
        for (target, from, to) in foreign_keys(conn, &other)? {
            if target == table {
                schema = schema.with_association(
                    Association::has_many(other.clone(), other.clone(), from)
                        .references(to.unwrap_or_else(|| "id".into())),
                );
            }
        }
    }

    Ok(schema)
}

/// `(target table, local column, target column)` for each foreign key of `table`.
fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<(String, String, Option<String>)>> {
    let mut stmt =
        conn.prepare("SELECT \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq")?;
    let keys = stmt
        .query_map([table], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(keys)
}
