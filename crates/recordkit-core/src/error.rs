//! Error types for recordkit-core.

use miette::Diagnostic;
use recordkit_db::{DbError, ValidationFailure};
use recordkit_query::SchemaError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Option `{key}` is not accepted here")]
    #[diagnostic(code(recordkit::invalid_option), help("Accepted options: {allowed}"))]
    InvalidOption { key: String, allowed: String },

    #[error("Invalid value for option `{key}`: {reason}")]
    #[diagnostic(code(recordkit::invalid_option_value))]
    InvalidOptionValue { key: String, reason: String },

    #[error("Couldn't find `{table}` records: {detail}")]
    #[diagnostic(
        code(recordkit::record_not_found),
        help("Use the fetch variant to get the records that do exist")
    )]
    RecordNotFound { table: String, detail: String },

    #[error("Expected at most one `{table}` record for {detail}")]
    #[diagnostic(
        code(recordkit::multiple_results),
        help("Narrow the condition or pass a limit of 1 to take the first match")
    )]
    MultipleResults { table: String, detail: String },

    #[error("Invalid `{table}` record: {failure}")]
    #[diagnostic(code(recordkit::validation))]
    Validation {
        table: String,
        #[source]
        failure: ValidationFailure,
    },

    #[error("Invalid record configuration: {0}")]
    #[diagnostic(
        code(recordkit::configuration),
        help("Key lookups and batch iteration need exactly one integer primary key")
    )]
    Configuration(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
