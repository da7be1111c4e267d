//! A record type that works for any table.

use recordkit_query::Value;
use rusqlite::Row;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{helpers::value_to_json, traits::FromRow, Record};

/// Column values of one row, in the order the statement returned them, plus
/// any preloaded associations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    columns: Vec<(String, Value)>,
    preloaded: Vec<(String, Vec<DynamicRecord>)>,
}

impl DynamicRecord {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self {
            columns,
            preloaded: vec![],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    /// Rows attached for `association`, if it was preloaded.
    pub fn preloaded(&self, association: &str) -> Option<&[DynamicRecord]> {
        self.preloaded
            .iter()
            .find(|(name, _)| name == association)
            .map(|(_, records)| records.as_slice())
    }
}

impl FromRow for DynamicRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let stmt = row.as_ref();
        let columns = (0..stmt.column_count())
            .map(|idx| {
                let name = stmt.column_name(idx)?.to_string();
                let value = row.get::<_, Value>(idx)?;
                Ok((name, value))
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Self::new(columns))
    }
}

impl Record for DynamicRecord {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn attach(&mut self, name: &str, records: Vec<DynamicRecord>) {
        match self.preloaded.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = records,
            None => self.preloaded.push((name.to_string(), records)),
        }
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + self.preloaded.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, &value_to_json(value))?;
        }
        for (name, records) in &self.preloaded {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn test_reads_every_column_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        let record = conn
            .query_row("SELECT 1 AS id, 'ada' AS name, NULL AS bio", [], |row| {
                DynamicRecord::from_row(row)
            })
            .unwrap();

        assert_eq!(record.get("id"), Some(&Value::Integer(1)));
        assert_eq!(record.field("bio"), Some(Value::Null));
        assert_eq!(record.field("missing"), None);
        let names: Vec<_> = record.columns().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "bio"]);
    }

    #[test]
    fn test_serializes_preloaded_rows() {
        let mut user = DynamicRecord::new(vec![("id".into(), Value::Integer(1))]);
        user.attach(
            "posts",
            vec![DynamicRecord::new(vec![("title".into(), Value::Text("hi".into()))])],
        );

        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"id":1,"posts":[{"title":"hi"}]}"#);
        assert_eq!(user.preloaded("posts").map(<[_]>::len), Some(1));
    }
}
