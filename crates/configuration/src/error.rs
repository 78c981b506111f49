use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    #[error("A database connection must be provided.")]
    MissingConnection,

    #[error("A target table name must be provided.")]
    MissingTableName,

    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),
}
