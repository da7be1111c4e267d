//! The composed query value.

use rusqlite::types::Value;

use crate::{
    expr::{quote_ident, CmpOp, Field, Predicate},
    query::{
        clause::{where_sql, Aggregate, Direction, OrderClause},
        DeleteQuery, UpdateQuery,
    },
    schema::{Association, Schema},
};

/// An immutable description of a to-be-executed fetch.
///
/// Constructed via [`Query::from_table`] (or from a [`Schema`]), then narrowed
/// with `.filter()`, `.with_order()`, etc. Every builder method consumes the
/// query and returns a new one; nothing is executed here. Rendering to SQL is
/// done by the `to_*_sql` methods and execution belongs to a repository.
///
/// # Example
///
/// ```rust
/// use recordkit_query::{Direction, Query};
///
/// let (sql, params) = Query::from_table("users")
///     .with_equality_filter("name", "ada".to_string())
///     .with_order("id", Direction::Asc)
///     .with_limit(10)
///     .to_select_sql();
///
/// assert_eq!(
///     sql,
///     "SELECT * FROM \"users\" WHERE \"name\" = ? ORDER BY \"id\" ASC LIMIT 10"
/// );
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    wheres: Vec<Predicate>,
    orders: Vec<OrderClause>,
    limit: Option<u64>,
    offset: Option<u64>,
    preloads: Vec<Association>,
}

impl Query {
    /// Starts a new query on the given table.
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            wheres: vec![],
            orders: vec![],
            limit: None,
            offset: None,
            preloads: vec![],
        }
    }

    /// Adds a WHERE condition. Conditions are joined with `AND` in the order added.
    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        self.wheres.push(predicate.into());
        self
    }

    pub fn with_equality_filter(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::compare(field, CmpOp::Eq, value))
    }

    pub fn with_membership_filter<T, I>(self, field: impl Into<Field>, values: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        self.filter(Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        })
    }

    pub fn with_null_filter(self, field: impl Into<Field>) -> Self {
        self.filter(Predicate::Null {
            field: field.into(),
            is_null: true,
        })
    }

    /// Appends an ORDER BY clause.
    pub fn with_order(mut self, field: impl Into<Field>, direction: Direction) -> Self {
        self.orders.push(OrderClause {
            field: field.into(),
            direction,
        });
        self
    }

    /// Drops every ORDER BY clause.
    pub fn without_order(mut self) -> Self {
        self.orders.clear();
        self
    }

    /// Limit the number of results
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set query offset
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Drops any limit and offset.
    pub fn without_paging(mut self) -> Self {
        self.limit = None;
        self.offset = None;
        self
    }

    /// Requests eager loading of an association. Repeated names are kept once.
    pub fn with_preload(mut self, association: Association) -> Self {
        if !self.preloads.iter().any(|p| p.name == association.name) {
            self.preloads.push(association);
        }
        self
    }

    /// Set pagination params. `page` is 1-based; page 0 is treated as page 1.
    /// An offset past `u64::MAX` saturates.
    pub fn page(mut self, page: u64, per_page: u64) -> Self {
        self.limit = Some(per_page);
        self.offset = Some(page.saturating_sub(1).saturating_mul(per_page));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.wheres
    }

    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn preloads(&self) -> &[Association] {
        &self.preloads
    }

    pub fn to_select_sql(&self) -> (String, Vec<Value>) {
        let mut params = vec![];
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));

        sql.push_str(&where_sql(&self.wheres, &mut params));

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            let orders = self
                .orders
                .iter()
                .map(OrderClause::to_sql)
                .collect::<Vec<_>>();
            sql.push_str(&orders.join(", "));
        }

        // SQLite reads LIMIT and OFFSET as signed 64-bit integers
        match (self.limit, self.offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", clamp_i64(limit))),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(_)) => sql.push_str(" LIMIT -1"),
            (None, None) => {}
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", clamp_i64(offset)));
        }

        (sql, params)
    }

    /// Renders `SELECT COUNT(*)` over the filtered rows, ignoring ordering and paging.
    pub fn to_count_sql(&self) -> (String, Vec<Value>) {
        self.to_aggregate_sql(Aggregate::Count, None)
    }

    /// Renders an aggregate over the filtered rows, ignoring ordering and paging.
    ///
    /// `field` is required for every function but `COUNT`, which falls back to `*`.
    pub fn to_aggregate_sql(&self, function: Aggregate, field: Option<&Field>) -> (String, Vec<Value>) {
        let mut params = vec![];
        let target = field.map_or_else(|| "*".to_string(), Field::quoted);
        let mut sql = format!(
            "SELECT {}({}) FROM {}",
            function.as_sql(),
            target,
            quote_ident(&self.table)
        );
        sql.push_str(&where_sql(&self.wheres, &mut params));
        (sql, params)
    }

    /// Renders a `DELETE` over the filtered rows.
    pub fn to_delete_sql(&self) -> (String, Vec<Value>) {
        DeleteQuery::from_query(self).build()
    }

    /// Renders an `UPDATE` applying `changes` to the filtered rows.
    pub fn to_update_sql<F, V>(&self, changes: impl IntoIterator<Item = (F, V)>) -> (String, Vec<Value>)
    where
        F: Into<Field>,
        V: Into<Value>,
    {
        changes
            .into_iter()
            .fold(UpdateQuery::from_query(self), |update, (field, value)| {
                update.set(field, value)
            })
            .build()
    }
}

fn clamp_i64(value: u64) -> u64 {
    value.min(i64::MAX as u64)
}

impl From<&Schema> for Query {
    fn from(schema: &Schema) -> Self {
        Query::from_table(schema.table())
    }
}
