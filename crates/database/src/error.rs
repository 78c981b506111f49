use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database connection settings: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to insert log record: {0}")]
    InsertFailed(#[source] sqlx::Error),

    /// Reported by `Backend` implementations whose release step can fail.
    /// Closing a `PgPool` cannot fail, so the Postgres backends never return it.
    #[error("Failed to release database connections: {0}")]
    ShutdownFailed(String),
}
