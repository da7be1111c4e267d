//! ActiveRecord-style helpers for one record type.

use std::{collections::HashMap, marker::PhantomData};

use recordkit_db::{helpers::as_integer, Changes, Entity, Record, Repository, Saved};
use recordkit_query::{Aggregate, Direction, Field, Query, Schema, Value};
use tracing::{debug, warn};

use crate::{
    batch::{BatchCursor, Batches, Records},
    compiler::{compile, compile_with},
    condition::Condition,
    error::{Error, Result},
    options::{
        AllOptions, AllowList, BatchOptions, FilterOptions, FindOptions, OptionsBag, QueryOptions,
    },
    page::Page,
};

/// Helpers bound to one record type `R` and one repository `P`.
///
/// # Example
///
/// ```rust
/// use recordkit_core::{Condition, FilterOptions, Model};
/// use recordkit_db::{DynamicRecord, SqliteRepository};
/// use recordkit_query::Schema;
///
/// let repo = SqliteRepository::open_in_memory().unwrap();
/// repo.with_conn(|conn| {
///     conn.execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)")?;
///     Ok(())
/// })
/// .unwrap();
///
/// let tags = Model::<DynamicRecord, _>::with_schema(repo, Schema::new("tags").with_primary_key("id"));
/// tags.create_strict(&[("label", "rust".to_string())].into_iter().collect()).unwrap();
///
/// let found = tags
///     .filter(&Condition::Empty.equals("label", "rust".to_string()), FilterOptions::default())
///     .unwrap();
/// assert_eq!(found.len(), 1);
/// ```
pub struct Model<R, P> {
    repo: P,
    schema: Schema,
    _record: PhantomData<fn() -> R>,
}

impl<R: Entity, P: Repository> Model<R, P> {
    pub fn new(repo: P) -> Self {
        Self::with_schema(repo, R::schema())
    }
}

impl<R: Record, P: Repository> Model<R, P> {
    pub fn with_schema(repo: P, schema: Schema) -> Self {
        Self {
            repo,
            schema,
            _record: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn repository(&self) -> &P {
        &self.repo
    }

    /// The unfiltered base query.
    pub fn query(&self) -> Query {
        self.schema.query()
    }

    fn table(&self) -> &str {
        self.schema.table()
    }

    fn primary_key(&self) -> Result<&Field> {
        Ok(self.schema.primary_key_field()?)
    }

    fn key_of(&self, record: &R) -> Result<i64> {
        let key = self.primary_key()?;
        record
            .field(key.name())
            .as_ref()
            .and_then(as_integer)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "primary key `{}` of `{}` is not an integer",
                    key,
                    self.table()
                ))
            })
    }

    fn target(&self, record: &R) -> Result<Query> {
        let key = self.primary_key()?;
        let value = record.field(key.name()).ok_or_else(|| {
            Error::Configuration(format!("`{}` records carry no `{}` value", self.table(), key))
        })?;
        Ok(self.query().with_equality_filter(key, value))
    }

    fn strict<T>(&self, saved: Saved<T>) -> Result<T> {
        saved.map_err(|failure| Error::Validation {
            table: self.table().to_string(),
            failure,
        })
    }

    /// Every record.
    pub fn all(&self, options: AllOptions) -> Result<Vec<R>> {
        let query = compile_with(&self.schema, &Condition::Empty, &options.into())?;
        Ok(self.repo.fetch_all(&query)?)
    }

    /// Every record, with options given as text.
    pub fn all_with(&self, options: &OptionsBag) -> Result<Vec<R>> {
        let query = compile(&self.schema, &Condition::Empty, options, &AllowList::ALL)?;
        Ok(self.repo.fetch_all(&query)?)
    }

    /// The record with primary key `id`.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] if there is none.
    pub fn find(&self, id: i64) -> Result<R> {
        let key = self.primary_key()?;
        self.fetch(id)?.ok_or_else(|| Error::RecordNotFound {
            table: self.table().to_string(),
            detail: format!("{}={}", key, id),
        })
    }

    /// The records with the given primary keys, in the order requested.
    ///
    /// Repeated ids are returned once.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] naming the missing ids unless every id exists.
    pub fn find_many(&self, ids: &[i64]) -> Result<Vec<R>> {
        let ids = unique(ids);
        let mut found = self.fetch_keyed(&ids)?;

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains_key(*id))
            .map(i64::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(Error::RecordNotFound {
                table: self.table().to_string(),
                detail: format!(
                    "expected {} records, found {} (missing ids: {})",
                    ids.len(),
                    ids.len() - missing.len(),
                    missing.join(", ")
                ),
            });
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// The record with primary key `id`, if it exists.
    pub fn fetch(&self, id: i64) -> Result<Option<R>> {
        let key = self.primary_key()?;
        let query = self.query().with_equality_filter(key, id);
        Ok(self.repo.fetch_one(&query)?)
    }

    /// The records among `ids` that exist, in the order requested.
    pub fn fetch_many(&self, ids: &[i64]) -> Result<Vec<R>> {
        let ids = unique(ids);
        let mut found = self.fetch_keyed(&ids)?;
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    fn fetch_keyed(&self, ids: &[i64]) -> Result<HashMap<i64, R>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let key = self.primary_key()?;
        let query = self.query().with_membership_filter(key, ids.iter().copied());
        self.repo
            .fetch_all::<R>(&query)?
            .into_iter()
            .map(|record| Ok((self.key_of(&record)?, record)))
            .collect()
    }

    /// Records matching `condition`.
    pub fn filter(&self, condition: &Condition, options: FilterOptions) -> Result<Vec<R>> {
        let query = compile_with(&self.schema, condition, &options.into())?;
        Ok(self.repo.fetch_all(&query)?)
    }

    /// Records matching `condition`, with options given as text.
    pub fn filter_with(&self, condition: &Condition, options: &OptionsBag) -> Result<Vec<R>> {
        let query = compile(&self.schema, condition, options, &AllowList::FILTER)?;
        Ok(self.repo.fetch_all(&query)?)
    }

    /// The single record matching `condition`, if any.
    ///
    /// # Errors
    ///
    /// [`Error::MultipleResults`] when more than one record matches and no
    /// `limit` was given. With a `limit`, the first match is returned.
    pub fn find_by(&self, condition: &Condition, options: FindOptions) -> Result<Option<R>> {
        find_one(&self.repo, &self.schema, condition, options.into())
    }

    /// Like [`find_by`](Self::find_by), with options given as text.
    pub fn find_by_with(&self, condition: &Condition, options: &OptionsBag) -> Result<Option<R>> {
        let options = options.to_query_options(&AllowList::FIND)?;
        find_one(&self.repo, &self.schema, condition, options)
    }

    /// Like [`find_by`](Self::find_by), failing with [`Error::RecordNotFound`] when nothing matches.
    pub fn find_by_strict(&self, condition: &Condition, options: FindOptions) -> Result<R> {
        self.find_by(condition, options)?
            .ok_or_else(|| Error::RecordNotFound {
                table: self.table().to_string(),
                detail: format!("no record matches {:?}", condition),
            })
    }

    /// Inserts a record built from `changes`.
    pub fn create(&self, changes: &Changes) -> Result<Saved<R>> {
        Ok(self.repo.insert(self.table(), changes)?)
    }

    pub fn create_strict(&self, changes: &Changes) -> Result<R> {
        let saved = self.create(changes)?;
        self.strict(saved)
    }

    /// Applies `changes` to `record` and returns the stored result.
    pub fn update(&self, record: &R, changes: &Changes) -> Result<Saved<R>> {
        let target = self.target(record)?;
        Ok(self.repo.update(&target, changes)?)
    }

    pub fn update_strict(&self, record: &R, changes: &Changes) -> Result<R> {
        let saved = self.update(record, changes)?;
        self.strict(saved)
    }

    /// Deletes `record` and returns it as it was stored.
    pub fn delete(&self, record: &R) -> Result<Saved<R>> {
        let target = self.target(record)?;
        Ok(self.repo.delete(&target)?)
    }

    pub fn delete_strict(&self, record: &R) -> Result<R> {
        let saved = self.delete(record)?;
        self.strict(saved)
    }

    /// Applies `changes` to every record matching `condition`. Returns the row count.
    pub fn update_all(&self, condition: &Condition, changes: &Changes) -> Result<usize> {
        let query = compile_with(&self.schema, condition, &QueryOptions::default())?;
        Ok(self.repo.update_all(&query, changes)?)
    }

    /// Deletes every record matching `condition`. Returns the row count.
    ///
    /// An empty condition deletes every row of the table.
    pub fn delete_all(&self, condition: &Condition) -> Result<usize> {
        let query = compile_with(&self.schema, condition, &QueryOptions::default())?;
        if query.predicates().is_empty() {
            warn!(table = self.table(), "deleting every row: no condition given");
        }
        Ok(self.repo.delete_all(&query)?)
    }

    /// The record whose columns equal `changes`, inserting it if none exists.
    ///
    /// The lookup and the insert share one transaction, so concurrent calls
    /// with the same attributes leave exactly one row.
    pub fn find_or_create_by(&self, changes: &Changes) -> Result<Saved<R>> {
        let condition = Condition::from(changes);
        self.repo.transaction(|repo| {
            let options = QueryOptions {
                limit: Some(1),
                ..Default::default()
            };
            if let Some(found) = find_one(repo, &self.schema, &condition, options)? {
                return Ok(Ok(found));
            }
            debug!(table = self.table(), "no match; inserting");
            Ok(repo.insert(self.table(), changes)?)
        })
    }

    pub fn find_or_create_by_strict(&self, changes: &Changes) -> Result<R> {
        let saved = self.find_or_create_by(changes)?;
        self.strict(saved)
    }

    pub fn count(&self, condition: &Condition) -> Result<u64> {
        let value = self.aggregate(condition, Aggregate::Count, None)?;
        Ok(value.as_ref().and_then(as_integer).unwrap_or(0).max(0) as u64)
    }

    pub fn exists(&self, condition: &Condition) -> Result<bool> {
        let query = compile_with(&self.schema, condition, &QueryOptions::default())?;
        Ok(self.repo.fetch_one::<R>(&query)?.is_some())
    }

    /// `None` when no row has a non-null `field`.
    pub fn sum(&self, condition: &Condition, field: impl Into<Field>) -> Result<Option<Value>> {
        self.aggregate(condition, Aggregate::Sum, Some(&field.into()))
    }

    pub fn avg(&self, condition: &Condition, field: impl Into<Field>) -> Result<Option<Value>> {
        self.aggregate(condition, Aggregate::Avg, Some(&field.into()))
    }

    pub fn min(&self, condition: &Condition, field: impl Into<Field>) -> Result<Option<Value>> {
        self.aggregate(condition, Aggregate::Min, Some(&field.into()))
    }

    pub fn max(&self, condition: &Condition, field: impl Into<Field>) -> Result<Option<Value>> {
        self.aggregate(condition, Aggregate::Max, Some(&field.into()))
    }

    pub fn aggregate(
        &self,
        condition: &Condition,
        function: Aggregate,
        field: Option<&Field>,
    ) -> Result<Option<Value>> {
        let query = compile_with(&self.schema, condition, &QueryOptions::default())?;
        Ok(self.repo.aggregate(&query, function, field)?)
    }

    /// One page of the records matching `condition`. `page` is 1-based.
    ///
    /// `limit` and `offset` in `options` are replaced by the page bounds.
    pub fn paginate(
        &self,
        condition: &Condition,
        page: u64,
        per_page: u64,
        options: FilterOptions,
    ) -> Result<Page<R>> {
        if page == 0 {
            return Err(Error::InvalidOptionValue {
                key: "page".into(),
                reason: "pages start at 1".into(),
            });
        }
        if per_page == 0 {
            return Err(Error::InvalidOptionValue {
                key: "per_page".into(),
                reason: "must be greater than 0".into(),
            });
        }

        let in_range = (page - 1)
            .checked_mul(per_page)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(Error::InvalidOptionValue {
                key: "page".into(),
                reason: format!("page {} of {} records each is out of range", page, per_page),
            });
        }

        let query = compile_with(&self.schema, condition, &options.into())?;
        let total = self
            .repo
            .aggregate(&query, Aggregate::Count, None)?
            .as_ref()
            .and_then(as_integer)
            .unwrap_or(0)
            .max(0) as u64;
        let items = self.repo.fetch_all(&query.page(page, per_page))?;

        Ok(Page::new(items, page, per_page, total))
    }

    /// The record with the lowest key matching `condition`.
    pub fn first(&self, condition: &Condition) -> Result<Option<R>> {
        Ok(self.first_n(condition, 1)?.into_iter().next())
    }

    /// Up to `n` records with the lowest keys, ascending.
    pub fn first_n(&self, condition: &Condition, n: u64) -> Result<Vec<R>> {
        self.edge(condition, n, Direction::Asc)
    }

    /// The record with the highest key matching `condition`.
    pub fn last(&self, condition: &Condition) -> Result<Option<R>> {
        Ok(self.last_n(condition, 1)?.into_iter().next())
    }

    /// Up to `n` records with the highest keys, returned in ascending key order.
    pub fn last_n(&self, condition: &Condition, n: u64) -> Result<Vec<R>> {
        let mut records = self.edge(condition, n, Direction::Desc)?;
        records.reverse();
        Ok(records)
    }

    fn edge(&self, condition: &Condition, n: u64, direction: Direction) -> Result<Vec<R>> {
        let key = self.primary_key()?;
        let query = compile_with(&self.schema, condition, &QueryOptions::default())?
            .without_order()
            .with_order(key, direction)
            .with_limit(n);
        Ok(self.repo.fetch_all(&query)?)
    }

    /// A lazy sequence of pages over the records matching `condition`, in key order.
    ///
    /// Every call starts an independent scan.
    pub fn batches(&self, condition: &Condition, options: BatchOptions) -> Result<Batches<'_, R, P>> {
        let key = self.primary_key()?.clone();
        let base = compile_with(&self.schema, condition, &QueryOptions::from(&options))?;
        let cursor = BatchCursor::new(key, base, options.batch_size, options.start, options.finish)?;
        Ok(Batches::new(&self.repo, cursor))
    }

    /// Like [`batches`](Self::batches), with options given as text.
    pub fn batches_with(&self, condition: &Condition, options: &OptionsBag) -> Result<Batches<'_, R, P>> {
        self.batches(condition, BatchOptions::from_bag(options)?)
    }

    /// The records of [`batches`](Self::batches), one at a time.
    pub fn records(&self, condition: &Condition, options: BatchOptions) -> Result<Records<'_, R, P>> {
        Ok(Records::new(self.batches(condition, options)?))
    }

    /// Calls `handler` with every page. The first handler error stops the scan
    /// and is returned unchanged.
    pub fn find_in_batches<E, F>(
        &self,
        condition: &Condition,
        options: BatchOptions,
        mut handler: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(Vec<R>) -> std::result::Result<(), E>,
    {
        for batch in self.batches(condition, options)? {
            handler(batch?)?;
        }
        Ok(())
    }

    /// Calls `handler` with every record, in key order. The first handler error
    /// stops the scan and is returned unchanged.
    pub fn find_each<E, F>(
        &self,
        condition: &Condition,
        options: BatchOptions,
        mut handler: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(R) -> std::result::Result<(), E>,
    {
        self.find_in_batches(condition, options, |batch| {
            batch.into_iter().try_for_each(&mut handler)
        })
    }
}

fn unique(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// The single record `condition` selects through `repo`.
fn find_one<R: Record, P: Repository>(
    repo: &P,
    schema: &Schema,
    condition: &Condition,
    options: QueryOptions,
) -> Result<Option<R>> {
    let query = compile_with(schema, condition, &options)?;
    if options.limit.is_some() {
        return Ok(repo.fetch_all::<R>(&query)?.into_iter().next());
    }

    let mut records: Vec<R> = repo.fetch_all(&query.with_limit(2))?;
    if records.len() > 1 {
        return Err(Error::MultipleResults {
            table: schema.table().to_string(),
            detail: format!("{:?}", condition),
        });
    }
    Ok(records.pop())
}
