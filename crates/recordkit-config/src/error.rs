use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(recordkit_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(recordkit_config::toml_deserialize),
        help("Check your recordkit.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid value for `{key}`: {reason}")]
    #[diagnostic(
        code(recordkit_config::invalid_value),
        help("Fix the value in your configuration file or pass it on the command line")
    )]
    InvalidValue { key: &'static str, reason: String },

    #[error("No database configured")]
    #[diagnostic(
        code(recordkit_config::missing_database),
        help("Set `database_path` in recordkit.toml or pass --db")
    )]
    MissingDatabase,

    #[error("IO error: {0}")]
    #[diagnostic(code(recordkit_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
