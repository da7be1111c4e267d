//! Column assignments for inserts and updates.

use recordkit_query::{Field, Value};

/// An ordered list of `(column, value)` assignments.
///
/// Setting a column twice keeps its first position and the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes(Vec<(Field, Value)>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<Field>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(f, _)| f.name() == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<F: Into<Field>, V: Into<Value>> FromIterator<(F, V)> for Changes {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        let mut changes = Changes::new();
        for (field, value) in iter {
            changes.insert(field, value);
        }
        changes
    }
}

impl IntoIterator for Changes {
    type Item = (Field, Value);
    type IntoIter = std::vec::IntoIter<(Field, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Changes {
    type Item = &'a (Field, Value);
    type IntoIter = std::slice::Iter<'a, (Field, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
