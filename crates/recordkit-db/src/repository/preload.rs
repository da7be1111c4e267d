use std::collections::{HashMap, HashSet};

use recordkit_query::{Association, AssociationKind, Query, Value};
use rusqlite::Connection;
use tracing::debug;

use super::sqlite::fetch_rows;
use crate::{error::DbError, record::DynamicRecord, Record, Result};

/// Hashable form of a non-null key value.
#[derive(Debug, PartialEq, Eq, Hash)]
enum ValueKey {
    Integer(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl ValueKey {
    fn new(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Integer(i) => Some(Self::Integer(*i)),
            Value::Real(f) => Some(Self::Real(f.to_bits())),
            Value::Text(s) => Some(Self::Text(s.clone())),
            Value::Blob(b) => Some(Self::Blob(b.clone())),
        }
    }
}

/// Loads each association for all `records` with one query per association.
pub(crate) fn attach_all<R: Record>(
    conn: &Connection,
    records: &mut [R],
    associations: &[Association],
) -> Result<()> {
    for association in associations {
        attach(conn, records, association)?;
    }
    Ok(())
}

fn attach<R: Record>(conn: &Connection, records: &mut [R], association: &Association) -> Result<()> {
    let (owner_key, target_key) = match association.kind {
        AssociationKind::HasMany => (&association.references, &association.foreign_key),
        AssociationKind::BelongsTo => (&association.foreign_key, &association.references),
    };

    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for record in records.iter() {
        let value = record.field(owner_key.name()).ok_or_else(|| {
            DbError::ConfigurationError(format!(
                "cannot preload `{}`: records have no `{}` column",
                association.name, owner_key
            ))
        })?;
        if let Some(key) = ValueKey::new(&value) {
            if seen.insert(key) {
                keys.push(value);
            }
        }
    }

    let mut grouped: HashMap<ValueKey, Vec<DynamicRecord>> = HashMap::new();
    if !keys.is_empty() {
        let (sql, params) = Query::from_table(&association.table)
            .with_membership_filter(target_key, keys)
            .to_select_sql();
        for row in fetch_rows::<DynamicRecord>(conn, &sql, &params)? {
            if let Some(key) = row.get(target_key.name()).and_then(ValueKey::new) {
                grouped.entry(key).or_default().push(row);
            }
        }
    }

    debug!(
        association = %association.name,
        owners = records.len(),
        groups = grouped.len(),
        "preloaded association"
    );

    for record in records.iter_mut() {
        let related = record
            .field(owner_key.name())
            .and_then(|value| ValueKey::new(&value))
            .and_then(|key| grouped.get(&key).cloned())
            .unwrap_or_default();
        record.attach(&association.name, related);
    }

    Ok(())
}
