//! Record-type descriptors.
//!
//! A [`Schema`] names the table behind a record type, its columns, its
//! primary key(s) and the associations that can be preloaded. It is the
//! "base queryable entity" every composed [`Query`] starts from.

use miette::Diagnostic;
use thiserror::Error;

use crate::{expr::Field, query::Query};

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table `{0}` declares no primary key")]
    #[diagnostic(
        code(recordkit_query::missing_primary_key),
        help("Declare exactly one primary key field for this record type")
    )]
    MissingPrimaryKey(String),

    #[error("Table `{table}` declares a composite primary key ({keys})")]
    #[diagnostic(
        code(recordkit_query::composite_primary_key),
        help("Key lookups and cursor iteration need a single integer primary key")
    )]
    CompositePrimaryKey { table: String, keys: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Children rows in `table` point back at the owner through `foreign_key`.
    HasMany,
    /// The owner row carries `foreign_key`, pointing at a row of `table`.
    BelongsTo,
}

/// A named relation that can be eager-loaded with `preload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub name: String,
    pub kind: AssociationKind,
    pub table: String,
    pub foreign_key: Field,
    /// The key the foreign key points at: the owner's key for `HasMany`, the
    /// target's key for `BelongsTo`. Defaults to `id`.
    pub references: Field,
}

impl Association {
    pub fn has_many(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<Field>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: AssociationKind::HasMany,
            table: table.into(),
            foreign_key: foreign_key.into(),
            references: Field::from_static("id"),
        }
    }

    pub fn belongs_to(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<Field>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: AssociationKind::BelongsTo,
            table: table.into(),
            foreign_key: foreign_key.into(),
            references: Field::from_static("id"),
        }
    }

    pub fn references(mut self, key: impl Into<Field>) -> Self {
        self.references = key.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    table: String,
    fields: Vec<Field>,
    primary_keys: Vec<Field>,
    associations: Vec<Association>,
}

impl Schema {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: vec![],
            primary_keys: vec![],
            associations: vec![],
        }
    }

    pub fn with_field(mut self, field: impl Into<Field>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    /// Marks `field` as (part of) the primary key, declaring it if needed.
    pub fn with_primary_key(mut self, field: impl Into<Field>) -> Self {
        let field = field.into();
        if !self.primary_keys.contains(&field) {
            self.primary_keys.push(field.clone());
        }
        self.with_field(field)
    }

    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn primary_keys(&self) -> &[Field] {
        &self.primary_keys
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// The single declared primary key.
    ///
    /// # Errors
    ///
    /// Fails when zero or more than one primary key field is declared.
    pub fn primary_key_field(&self) -> Result<&Field, SchemaError> {
        match self.primary_keys.as_slice() {
            [key] => Ok(key),
            [] => Err(SchemaError::MissingPrimaryKey(self.table.clone())),
            keys => Err(SchemaError::CompositePrimaryKey {
                table: self.table.clone(),
                keys: keys
                    .iter()
                    .map(Field::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// An unfiltered query over this table.
    pub fn query(&self) -> Query {
        Query::from(self)
    }
}
