use crate::builder::BuilderBackend;
use crate::connection::connect_lazy;
use crate::error::DbError;
use crate::pool::PoolBackend;
use crate::table::TableName;
use configuration::{BackendKind, ConnectionSettings};
use record::LogRecord;
use sqlx::PgPool;
use std::future::Future;

/// The columns every backend writes, in bind order.
pub const COLUMNS: [&str; 7] = ["name", "level", "hostname", "msg", "pid", "time", "content"];

/// The capability a log sink needs from its storage.
///
/// `insert` may be called concurrently from many in-flight writes against the
/// same backend. `shutdown` is called at most once, after every insert has
/// settled, and must not resolve while connections are still held.
pub trait Backend: Send + Sync + 'static {
    /// Persists one record as one row.
    fn insert(&self, record: LogRecord) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Releases the connection resources owned by this backend.
    fn shutdown(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// The most inserts the sink keeps in flight at once; the rest stay queued.
    ///
    /// Pooled backends return their connection limit, so every started insert
    /// can be granted a connection without waiting behind queued ones.
    fn max_in_flight(&self) -> usize {
        usize::MAX
    }
}

/// The connection value a sink is constructed from.
#[derive(Debug, Clone)]
pub enum Connection {
    /// A descriptor; the sink creates and owns the pool.
    Settings(ConnectionSettings),
    /// A caller-supplied pool, written to with parameterized statements.
    Pool(PgPool),
    /// A caller-supplied pool, written to through a query builder.
    Builder(PgPool),
}

impl From<ConnectionSettings> for Connection {
    fn from(settings: ConnectionSettings) -> Self {
        Connection::Settings(settings)
    }
}

/// The Postgres backends, selected once when the sink is built.
#[derive(Debug, Clone)]
pub enum PgBackend {
    Pool(PoolBackend),
    Builder(BuilderBackend),
}

impl PgBackend {
    /// Builds the backend matching the shape of `connection`.
    ///
    /// A pool created from a descriptor is always closed on shutdown. A pool
    /// handed in by the caller is closed only when `close_supplied` is set.
    pub fn from_connection(
        connection: Connection,
        table: TableName,
        close_supplied: bool,
    ) -> Result<Self, DbError> {
        let backend = match connection {
            Connection::Settings(settings) => {
                let pool = connect_lazy(&settings)?;
                match settings.backend {
                    BackendKind::Pool => PgBackend::Pool(PoolBackend::new(pool, table, true)),
                    BackendKind::Builder => {
                        PgBackend::Builder(BuilderBackend::new(pool, table, true))
                    }
                }
            }
            Connection::Pool(pool) => PgBackend::Pool(PoolBackend::new(pool, table, close_supplied)),
            Connection::Builder(pool) => {
                PgBackend::Builder(BuilderBackend::new(pool, table, close_supplied))
            }
        };

        tracing::debug!(kind = ?backend.kind(), table = %backend.table(), "Database backend selected.");
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            PgBackend::Pool(_) => BackendKind::Pool,
            PgBackend::Builder(_) => BackendKind::Builder,
        }
    }

    pub fn table(&self) -> &TableName {
        match self {
            PgBackend::Pool(backend) => backend.table(),
            PgBackend::Builder(backend) => backend.table(),
        }
    }

    /// The underlying pool, e.g. for reading back rows in tests.
    pub fn pool(&self) -> &PgPool {
        match self {
            PgBackend::Pool(backend) => backend.pool(),
            PgBackend::Builder(backend) => backend.pool(),
        }
    }
}

impl Backend for PgBackend {
    async fn insert(&self, record: LogRecord) -> Result<(), DbError> {
        match self {
            PgBackend::Pool(backend) => backend.insert(record).await,
            PgBackend::Builder(backend) => backend.insert(record).await,
        }
    }

    async fn shutdown(&self) -> Result<(), DbError> {
        match self {
            PgBackend::Pool(backend) => backend.shutdown().await,
            PgBackend::Builder(backend) => backend.shutdown().await,
        }
    }

    fn max_in_flight(&self) -> usize {
        let limit = self.pool().options().get_max_connections();
        usize::try_from(limit).unwrap_or(usize::MAX).max(1)
    }
}
