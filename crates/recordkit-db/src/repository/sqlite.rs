use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use parking_lot::ReentrantMutex;
use recordkit_query::{
    Aggregate, DeleteQuery, Field, InsertQuery, Query, Schema, UpdateQuery, Value,
};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use tracing::{debug, trace, warn};

use super::{introspect, preload, Repository};
use crate::{
    changes::Changes,
    connection,
    error::{DbError, Result},
    traits::FromRow,
    validation::{Action, Saved, ValidationFailure},
    Record,
};

/// A [`Repository`] over a single shared SQLite connection.
///
/// Clones share the connection. Transactions started through one clone block
/// every other thread using any clone until they finish; the thread that owns
/// the transaction can keep issuing calls, and nested `transaction` calls join
/// the enclosing one.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
    tx_gate: Arc<ReentrantMutex<()>>,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            tx_gate: Arc::new(ReentrantMutex::new(())),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        Ok(Self::new(connection::open(path, busy_timeout)?))
    }

    /// Like [`open`](Self::open), but fails instead of creating a missing file.
    pub fn open_existing<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        Ok(Self::new(connection::open_existing(path, busy_timeout)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(connection::open_in_memory()?))
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let _gate = self.tx_gate.lock();
        let conn = self.lock()?;
        f(&conn)
    }

    /// Reads the schema of `table` from the database catalogue.
    pub fn introspect(&self, table: &str) -> Result<Schema> {
        self.with_conn(|conn| introspect(conn, table))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::PoisonError)
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!(sql, "executing statement");
        self.with_conn(|conn| Ok(conn.execute_batch(sql)?))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(sql, "executing statement");
        trace!(?params);
        self.with_conn(|conn| Ok(conn.execute(sql, params_from_iter(params.iter()))?))
    }

    /// Runs a write that returns exactly one row.
    ///
    /// Constraint violations come back as a [`ValidationFailure`] for `action`.
    fn write_returning<R: Record>(
        &self,
        action: Action,
        table: &str,
        sql: &str,
        params: &[Value],
    ) -> Result<Saved<R>> {
        debug!(sql, "executing statement");
        trace!(?params);

        self.with_conn(|conn| {
            match conn.query_row(sql, params_from_iter(params.iter()), |row| R::from_row(row)) {
                Ok(record) => Ok(Ok(record)),
                Err(rusqlite::Error::SqliteFailure(err, message))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    let message = message.unwrap_or_else(|| err.to_string());
                    debug!(%action, table, %message, "write rejected by constraint");
                    Ok(Err(ValidationFailure::from_constraint(action, &message)))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(DbError::NotFound(format!(
                    "no `{}` row to {}",
                    table, action
                ))),
                Err(err) => Err(err.into()),
            }
        })
    }
}

/// Runs a select and converts every row.
pub(crate) fn fetch_rows<R: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<R>> {
    debug!(sql, "executing query");
    trace!(?params);

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| R::from_row(row))?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

impl Repository for SqliteRepository {
    fn fetch_all<R: Record>(&self, query: &Query) -> Result<Vec<R>> {
        let (sql, params) = query.to_select_sql();
        self.with_conn(|conn| {
            let mut records = fetch_rows::<R>(conn, &sql, &params)?;
            if !records.is_empty() {
                preload::attach_all(conn, &mut records, query.preloads())?;
            }
            Ok(records)
        })
    }

    fn fetch_one<R: Record>(&self, query: &Query) -> Result<Option<R>> {
        let records = self.fetch_all(&query.clone().with_limit(1))?;
        Ok(records.into_iter().next())
    }

    fn insert<R: Record>(&self, table: &str, changes: &Changes) -> Result<Saved<R>> {
        if let Err(failure) = R::validate(changes, Action::Insert) {
            return Ok(Err(failure));
        }

        let (sql, params) = changes
            .iter()
            .fold(InsertQuery::into(table), |insert, (field, value)| {
                insert.set(field, value.clone())
            })
            .build();
        self.write_returning(Action::Insert, table, &sql, &params)
    }

    fn update<R: Record>(&self, target: &Query, changes: &Changes) -> Result<Saved<R>> {
        if let Err(failure) = R::validate(changes, Action::Update) {
            return Ok(Err(failure));
        }

        if changes.is_empty() {
            return match self.fetch_one::<R>(target)? {
                Some(record) => Ok(Ok(record)),
                None => Err(DbError::NotFound(format!(
                    "no `{}` row to update",
                    target.table()
                ))),
            };
        }

        let (sql, params) = changes
            .iter()
            .fold(UpdateQuery::from_query(target), |update, (field, value)| {
                update.set(field, value.clone())
            })
            .returning_all()
            .build();
        self.write_returning(Action::Update, target.table(), &sql, &params)
    }

    fn delete<R: Record>(&self, target: &Query) -> Result<Saved<R>> {
        if let Err(failure) = R::validate(&Changes::new(), Action::Delete) {
            return Ok(Err(failure));
        }

        let (sql, params) = DeleteQuery::from_query(target)
            .returning_all()
            .build();
        self.write_returning(Action::Delete, target.table(), &sql, &params)
    }

    fn update_all(&self, query: &Query, changes: &Changes) -> Result<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        let (sql, params) = query.to_update_sql(changes.iter().cloned());
        self.execute(&sql, &params)
    }

    fn delete_all(&self, query: &Query) -> Result<usize> {
        let (sql, params) = query.to_delete_sql();
        self.execute(&sql, &params)
    }

    fn aggregate(
        &self,
        query: &Query,
        function: Aggregate,
        field: Option<&Field>,
    ) -> Result<Option<Value>> {
        let (sql, params) = query.to_aggregate_sql(function, field);
        debug!(sql, "executing query");
        trace!(?params);

        let value = self.with_conn(|conn| {
            Ok(conn.query_row(&sql, params_from_iter(params.iter()), |row| {
                row.get::<_, Value>(0)
            })?)
        })?;

        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&Self) -> std::result::Result<T, E>,
    {
        let _gate = self.tx_gate.lock();

        if !self.lock()?.is_autocommit() {
            trace!("joining enclosing transaction");
            return f(self);
        }

        // IMMEDIATE takes the write lock up front so concurrent read-then-write
        // blocks wait on each other instead of failing at upgrade time
        self.execute_batch("BEGIN IMMEDIATE")?;

        match f(self) {
            Ok(value) => {
                if let Err(err) = self.execute_batch("COMMIT") {
                    self.rollback();
                    return Err(err.into());
                }
                Ok(value)
            }
            Err(err) => {
                self.rollback();
                Err(err)
            }
        }
    }
}

impl SqliteRepository {
    fn rollback(&self) {
        if let Err(err) = self.execute_batch("ROLLBACK") {
            warn!("failed to roll back transaction: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use recordkit_query::{Association, Direction, Expression as _};
    use rusqlite::Row;

    use super::*;
    use crate::record::DynamicRecord;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
        age: Option<i64>,
        posts: Vec<DynamicRecord>,
    }

    impl FromRow for User {
        fn from_row(row: &Row) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                age: row.get("age")?,
                posts: vec![],
            })
        }
    }

    impl Record for User {
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.clone().into()),
                "age" => Some(self.age.into()),
                _ => None,
            }
        }

        fn validate(changes: &Changes, action: Action) -> std::result::Result<(), ValidationFailure> {
            let mut failure = ValidationFailure::new(action);
            if let Some(Value::Text(name)) = changes.get("name") {
                if name.trim().is_empty() {
                    failure = failure.add("name", "can't be blank");
                }
            }
            failure.check()
        }

        fn attach(&mut self, name: &str, records: Vec<DynamicRecord>) {
            if name == "posts" {
                self.posts = records;
            }
        }
    }

    fn setup_repo() -> SqliteRepository {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    age INTEGER
                );
                CREATE TABLE posts (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    title TEXT NOT NULL
                );
                INSERT INTO users (id, name, age) VALUES (1, 'ada', 36), (2, 'linus', 54), (3, 'grace', NULL);
                INSERT INTO posts (user_id, title) VALUES (1, 'engines'), (1, 'notes'), (2, 'kernels');",
            )?;
            Ok(())
        })
        .unwrap();
        repo
    }

    fn users() -> Query {
        Query::from_table("users")
    }

    #[test]
    fn test_fetch_all_and_one() {
        let repo = setup_repo();

        let all: Vec<User> = repo
            .fetch_all(&users().with_order("id", Direction::Desc))
            .unwrap();
        assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let one: Option<User> = repo.fetch_one(&users().with_null_filter("age")).unwrap();
        assert_eq!(one.map(|u| u.name), Some("grace".to_string()));

        let none: Option<User> = repo
            .fetch_one(&users().with_equality_filter("id", 99))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_has_many_preload() {
        let repo = setup_repo();
        let posts = Association::has_many("posts", "posts", "user_id");

        let all: Vec<User> = repo
            .fetch_all(&users().with_order("id", Direction::Asc).with_preload(posts))
            .unwrap();

        let counts: Vec<_> = all.iter().map(|u| u.posts.len()).collect();
        assert_eq!(counts, vec![2, 1, 0]);
        assert_eq!(
            all[1].posts[0].get("title"),
            Some(&Value::Text("kernels".into()))
        );
    }

    #[test]
    fn test_belongs_to_preload() {
        let repo = setup_repo();
        let author = Association::belongs_to("user", "users", "user_id");

        let posts: Vec<DynamicRecord> = repo
            .fetch_all(&Query::from_table("posts").with_preload(author))
            .unwrap();

        assert_eq!(posts.len(), 3);
        for post in &posts {
            let user = &post.preloaded("user").unwrap()[0];
            assert_eq!(user.get("id"), post.get("user_id"));
        }
    }

    #[test]
    fn test_insert_returns_stored_row() {
        let repo = setup_repo();

        let saved: Saved<User> = repo
            .insert("users", &Changes::new().set("name", "alan".to_string()))
            .unwrap();
        let user = saved.unwrap();
        assert_eq!(user.id, 4);
        assert_eq!(user.age, None);
    }

    #[test]
    fn test_validation_runs_before_insert() {
        let repo = setup_repo();

        let saved: Saved<User> = repo
            .insert("users", &Changes::new().set("name", " ".to_string()))
            .unwrap();
        let failure = saved.unwrap_err();
        assert_eq!(failure.action, Action::Insert);
        assert_eq!(failure.errors[0].field, "name");

        let count = repo.aggregate(&users(), Aggregate::Count, None).unwrap();
        assert_eq!(count, Some(Value::Integer(3)));
    }

    #[test]
    fn test_constraint_violation_is_validation_failure() {
        let repo = setup_repo();

        let saved: Saved<User> = repo
            .insert("users", &Changes::new().set("name", "ada".to_string()))
            .unwrap();
        let failure = saved.unwrap_err();
        assert_eq!(failure.errors[0].field, "name");
        assert!(failure.errors[0].message.contains("UNIQUE"));
    }

    #[test]
    fn test_update_and_delete_single_row() {
        let repo = setup_repo();
        let target = users().with_equality_filter("id", 2);

        let updated: User = repo
            .update(&target, &Changes::new().set("age", 55))
            .unwrap()
            .unwrap();
        assert_eq!(updated.age, Some(55));

        let deleted: User = repo.delete(&target).unwrap().unwrap();
        assert_eq!(deleted.name, "linus");

        let missing = repo.delete::<User>(&target);
        assert!(matches!(missing, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_update_all_and_delete_all() {
        let repo = setup_repo();

        let touched = repo
            .update_all(&users().filter(Field::new("age").not_null()), &Changes::new().set("age", 1))
            .unwrap();
        assert_eq!(touched, 2);

        let removed = repo
            .delete_all(&Query::from_table("posts").with_equality_filter("user_id", 1))
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_aggregates() {
        let repo = setup_repo();
        let age = Field::new("age");

        let sum = repo.aggregate(&users(), Aggregate::Sum, Some(&age)).unwrap();
        assert_eq!(sum, Some(Value::Integer(90)));

        let max = repo
            .aggregate(&users().with_equality_filter("id", 3), Aggregate::Max, Some(&age))
            .unwrap();
        assert_eq!(max, None);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let repo = setup_repo();

        let result: std::result::Result<(), DbError> = repo.transaction(|repo| {
            repo.delete_all(&Query::from_table("posts"))?;
            Err(DbError::QueryError("abort".into()))
        });
        assert!(result.is_err());

        let posts = repo
            .aggregate(&Query::from_table("posts"), Aggregate::Count, None)
            .unwrap();
        assert_eq!(posts, Some(Value::Integer(3)));
    }

    #[test]
    fn test_nested_transaction_joins_outer() {
        let repo = setup_repo();

        let result: std::result::Result<(), DbError> = repo.transaction(|outer| {
            outer.transaction(|inner| {
                inner.delete_all(&Query::from_table("posts"))?;
                Ok::<_, DbError>(())
            })?;
            Err(DbError::QueryError("abort".into()))
        });
        assert!(result.is_err());

        let posts = repo
            .aggregate(&Query::from_table("posts"), Aggregate::Count, None)
            .unwrap();
        assert_eq!(posts, Some(Value::Integer(3)));
    }

    #[test]
    fn test_introspect() {
        let repo = setup_repo();

        let schema = repo.introspect("posts").unwrap();
        assert_eq!(schema.primary_key_field().unwrap().name(), "id");
        assert_eq!(schema.fields().len(), 3);
        let user = schema.association("user").unwrap();
        assert_eq!(user.table, "users");
        assert_eq!(user.foreign_key.name(), "user_id");

        let schema = repo.introspect("users").unwrap();
        let posts = schema.association("posts").unwrap();
        assert_eq!(posts.kind, recordkit_query::AssociationKind::HasMany);

        assert!(matches!(
            repo.introspect("missing"),
            Err(DbError::NotFound(_))
        ));
    }
}
