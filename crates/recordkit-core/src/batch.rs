//! Keyset iteration over a primary-key range.
//!
//! A scan never uses offsets. Each page is the base query restricted to
//! `pk >= lower AND pk <= upper`, ordered by the key and limited to the batch
//! size; the next page starts just past the last key seen.

use std::{iter::FusedIterator, marker::PhantomData};

use recordkit_db::{helpers::as_integer, Record, Repository};
use recordkit_query::{Direction, Expression as _, Field, Query};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Bookkeeping for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCursor {
    primary_key: Field,
    lower_bound: i64,
    upper_bound: Option<i64>,
    batch_size: usize,
    base_query: Query,
    more_possible: bool,
}

impl BatchCursor {
    /// `batch_size` must be non-zero.
    pub fn new(
        primary_key: Field,
        base_query: Query,
        batch_size: usize,
        start: i64,
        finish: Option<i64>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidOptionValue {
                key: "batch_size".into(),
                reason: "must be greater than 0".into(),
            });
        }

        let dropped = dropped_clauses(&base_query);
        if !dropped.is_empty() {
            warn!(
                table = base_query.table(),
                dropped = %dropped.join(", "),
                "ignoring clauses on a batched query; batches are ordered and bounded by primary key"
            );
        }

        Ok(Self {
            primary_key,
            lower_bound: start,
            upper_bound: finish,
            batch_size,
            base_query: base_query.without_order().without_paging(),
            more_possible: true,
        })
    }

    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    pub fn more_possible(&self) -> bool {
        self.more_possible
    }

    /// The query for the next page.
    pub fn page_query(&self) -> Query {
        let mut query = self
            .base_query
            .clone()
            .filter(self.primary_key.clone().gte(self.lower_bound));
        if let Some(upper) = self.upper_bound {
            query = query.filter(self.primary_key.clone().lte(upper));
        }
        query
            .with_order(&self.primary_key, Direction::Asc)
            .with_limit(self.batch_size as u64)
    }

    /// Moves past a fetched page of `len` rows ending at `last_key`.
    fn advance(&mut self, last_key: i64, len: usize) {
        match last_key.checked_add(1) {
            Some(next) => {
                self.lower_bound = next;
                self.more_possible = len == self.batch_size;
            }
            None => self.more_possible = false,
        }
    }

    fn finish(&mut self) {
        self.more_possible = false;
    }
}

/// Caller clauses a scan replaces with its own key ordering and bounds.
fn dropped_clauses(query: &Query) -> Vec<&'static str> {
    let mut dropped = Vec::new();
    if !query.orders().is_empty() {
        dropped.push("ORDER BY");
    }
    if query.limit().is_some() {
        dropped.push("LIMIT");
    }
    if query.offset().is_some() {
        dropped.push("OFFSET");
    }
    dropped
}

/// A lazy sequence of record pages.
///
/// Each pull issues one fetch. A failed fetch is yielded once and ends the
/// sequence. The sequence cannot be rewound; ask the model for a new one.
pub struct Batches<'r, R, P> {
    repo: &'r P,
    cursor: BatchCursor,
    _record: PhantomData<fn() -> R>,
}

impl<'r, R: Record, P: Repository> Batches<'r, R, P> {
    pub fn new(repo: &'r P, cursor: BatchCursor) -> Self {
        Self {
            repo,
            cursor,
            _record: PhantomData,
        }
    }

    pub fn cursor(&self) -> &BatchCursor {
        &self.cursor
    }

    fn fetch_next_batch(&mut self) -> Result<Vec<R>> {
        let batch: Vec<R> = self.repo.fetch_all(&self.cursor.page_query())?;

        let Some(last) = batch.last() else {
            self.cursor.finish();
            return Ok(batch);
        };

        let key = self.cursor.primary_key.name();
        let last_key = last.field(key).as_ref().and_then(as_integer).ok_or_else(|| {
            Error::Configuration(format!(
                "primary key `{}` of `{}` is not an integer",
                key,
                self.cursor.base_query.table()
            ))
        })?;

        self.cursor.advance(last_key, batch.len());
        debug!(
            table = self.cursor.base_query.table(),
            rows = batch.len(),
            next_start = self.cursor.lower_bound,
            more = self.cursor.more_possible,
            "fetched batch"
        );

        Ok(batch)
    }
}

impl<R: Record, P: Repository> Iterator for Batches<'_, R, P> {
    type Item = Result<Vec<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cursor.more_possible {
            return None;
        }

        match self.fetch_next_batch() {
            Ok(batch) if batch.is_empty() => None,
            Ok(batch) => Some(Ok(batch)),
            Err(err) => {
                self.cursor.finish();
                Some(Err(err))
            }
        }
    }
}

impl<R: Record, P: Repository> FusedIterator for Batches<'_, R, P> {}

/// Records of a [`Batches`] sequence, one at a time and in key order.
pub struct Records<'r, R, P> {
    batches: Batches<'r, R, P>,
    buffer: std::vec::IntoIter<R>,
}

impl<'r, R: Record, P: Repository> Records<'r, R, P> {
    pub fn new(batches: Batches<'r, R, P>) -> Self {
        Self {
            batches,
            buffer: Vec::new().into_iter(),
        }
    }
}

impl<R: Record, P: Repository> Iterator for Records<'_, R, P> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            match self.batches.next()? {
                Ok(batch) => self.buffer = batch.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<R: Record, P: Repository> FusedIterator for Records<'_, R, P> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(batch_size: usize) -> BatchCursor {
        BatchCursor::new(
            Field::new("id"),
            Query::from_table("users"),
            batch_size,
            0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = BatchCursor::new(Field::new("id"), Query::from_table("users"), 0, 0, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOptionValue { ref key, .. } if key == "batch_size"));
    }

    #[test]
    fn test_page_query_bounds() {
        let cursor = BatchCursor::new(
            Field::new("id"),
            Query::from_table("users").with_equality_filter("active", 1),
            100,
            5,
            Some(50),
        )
        .unwrap();

        let (sql, params) = cursor.page_query().to_select_sql();
        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"active\" = ? AND \"id\" >= ? AND \"id\" <= ? ORDER BY \"id\" ASC LIMIT 100"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_caller_order_and_paging_dropped() {
        let cursor = BatchCursor::new(
            Field::new("id"),
            Query::from_table("users")
                .with_order("name", Direction::Desc)
                .with_offset(10),
            10,
            0,
            None,
        )
        .unwrap();

        let (sql, _) = cursor.page_query().to_select_sql();
        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"id\" >= ? ORDER BY \"id\" ASC LIMIT 10"
        );
    }

    #[test]
    fn test_dropped_clauses() {
        let plain = Query::from_table("users").with_equality_filter("active", 1);
        assert!(dropped_clauses(&plain).is_empty());

        let prebuilt = Query::from_table("users")
            .with_order("name", Direction::Asc)
            .with_limit(5)
            .with_offset(10);
        assert_eq!(dropped_clauses(&prebuilt), vec!["ORDER BY", "LIMIT", "OFFSET"]);

        let cursor = BatchCursor::new(Field::new("id"), prebuilt, 3, 0, None).unwrap();
        let (sql, _) = cursor.page_query().to_select_sql();
        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"id\" >= ? ORDER BY \"id\" ASC LIMIT 3"
        );
    }

    #[test]
    fn test_advance() {
        let mut full = cursor(10);
        full.advance(41, 10);
        assert_eq!(full.lower_bound(), 42);
        assert!(full.more_possible());

        let mut short = cursor(10);
        short.advance(7, 3);
        assert_eq!(short.lower_bound(), 8);
        assert!(!short.more_possible());

        let mut edge = cursor(1);
        edge.advance(i64::MAX, 1);
        assert!(!edge.more_possible());
    }
}
