use miette::Diagnostic;
use recordkit_config::error::ConfigError;
use recordkit_db::DbError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] recordkit_core::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid argument `{arg}`: {reason}")]
    #[diagnostic(code(recordkit::cli::invalid_argument))]
    InvalidArgument { arg: String, reason: String },

    #[error("Refusing to delete without confirmation")]
    #[diagnostic(
        code(recordkit::cli::confirmation_required),
        help("Pass --yes to delete every matching record")
    )]
    ConfirmationRequired,

    #[error("Failed to set up logging: {0}")]
    #[diagnostic(code(recordkit::cli::logging))]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("IO error: {0}")]
    #[diagnostic(code(recordkit::cli::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(recordkit::cli::json))]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
