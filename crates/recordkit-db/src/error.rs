//! Error types for recordkit-db.

use miette::Diagnostic;
use recordkit_query::SchemaError;
use thiserror::Error;

/// Database error type for repository operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(recordkit_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(code(recordkit_db::query))]
    QueryError(String),

    #[error("Record not found: {0}")]
    #[diagnostic(
        code(recordkit_db::not_found),
        help("The row may have been deleted by another writer")
    )]
    NotFound(String),

    #[error("Invalid record configuration: {0}")]
    #[diagnostic(
        code(recordkit_db::configuration),
        help("Check the schema declared for this record type")
    )]
    ConfigurationError(String),

    #[error("Database connection lock was poisoned")]
    #[diagnostic(
        code(recordkit_db::poisoned),
        help("A previous operation panicked while holding the connection")
    )]
    PoisonError,

    #[error("IO error: {0}")]
    #[diagnostic(code(recordkit_db::io), help("Check file permissions and disk space"))]
    IoError(#[from] std::io::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("Record not found".to_string()),
            rusqlite::Error::SqliteFailure(_, Some(message)) => DbError::QueryError(message),
            other => DbError::QueryError(other.to_string()),
        }
    }
}

impl From<SchemaError> for DbError {
    fn from(err: SchemaError) -> Self {
        DbError::ConfigurationError(err.to_string())
    }
}

/// Result type alias for recordkit-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
