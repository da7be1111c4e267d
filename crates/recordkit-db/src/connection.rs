//! Opening SQLite connections.

use std::{path::Path, time::Duration};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{DbError, Result};

/// Opens (creating if needed) the database file at `path`.
///
/// The connection waits up to `busy_timeout` for locks held by other
/// connections, runs in WAL mode and enforces foreign keys.
pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)
        .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
    conn.busy_timeout(busy_timeout)?;

    // WAL mode for better concurrent access
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    debug!(path = %path.display(), journal_mode = %mode, "opened database");
    Ok(conn)
}

/// Opens the existing database file at `path` for reading and writing.
///
/// Nothing is created and the journal mode is left as the file has it. A
/// missing file is a [`DbError::ConnectionError`] naming the path.
pub fn open_existing<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let path = path.as_ref();
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    debug!(path = %path.display(), "opened existing database");
    Ok(conn)
}

/// Opens a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn =
        Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(dir.path().join("nested/app.db"), Duration::from_millis(100)).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_open_existing_keeps_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo/app.db");

        let err = open_existing(&missing, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, DbError::ConnectionError(ref msg) if msg.contains("typo")));
        assert!(!missing.exists());
        assert!(!dir.path().join("typo").exists());

        let path = dir.path().join("app.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .unwrap();

        let conn = open_existing(&path, Duration::from_millis(100)).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "delete");
        conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap();
    }
}
