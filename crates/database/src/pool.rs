use crate::backend::{Backend, COLUMNS};
use crate::error::DbError;
use crate::table::TableName;
use record::LogRecord;
use sqlx::PgPool;

/// Writes each record with one parameterized INSERT on a pooled connection.
#[derive(Debug, Clone)]
pub struct PoolBackend {
    pool: PgPool,
    table: TableName,
    statement: String,
    close_on_shutdown: bool,
}

impl PoolBackend {
    pub fn new(pool: PgPool, table: TableName, close_on_shutdown: bool) -> Self {
        let statement = insert_statement(&table);
        Self {
            pool,
            table,
            statement,
            close_on_shutdown,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The SQL text run for every insert.
    pub fn statement(&self) -> &str {
        &self.statement
    }
}

impl Backend for PoolBackend {
    async fn insert(&self, record: LogRecord) -> Result<(), DbError> {
        // The connection goes back to the pool when `conn` is dropped.
        let mut conn = self.pool.acquire().await.map_err(DbError::InsertFailed)?;

        sqlx::query(&self.statement)
            .bind(record.name)
            .bind(record.level)
            .bind(record.hostname)
            .bind(record.msg)
            .bind(record.pid)
            .bind(record.time)
            .bind(record.content)
            .execute(&mut *conn)
            .await
            .map_err(DbError::InsertFailed)?;

        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DbError> {
        if self.close_on_shutdown {
            self.pool.close().await;
        }
        Ok(())
    }
}

fn insert_statement(table: &TableName) -> String {
    let columns = COLUMNS
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ");
    // `content` arrives as text and is stored as JSONB.
    format!(
        "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb)",
        table.quoted(),
        columns
    )
}
