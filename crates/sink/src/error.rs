use configuration::error::ConfigError;
use database::DbError;
use record::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid log sink configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to set up the database backend: {0}")]
    Database(#[from] DbError),

    #[error("Failed to decode log record: {0}")]
    Codec(#[from] CodecError),

    #[error("Log record was not persisted: {0}")]
    Backend(#[source] DbError),

    #[error("Failed to release the database backend: {0}")]
    Shutdown(#[source] DbError),

    #[error("The log sink has been ended and no longer accepts records.")]
    Closed,

    #[error("The log sink stopped before its backend was released.")]
    Terminated,
}
