use crate::backend::{Backend, COLUMNS};
use crate::error::DbError;
use crate::table::TableName;
use record::LogRecord;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Writes each record through `sqlx::QueryBuilder`.
#[derive(Debug, Clone)]
pub struct BuilderBackend {
    pool: PgPool,
    table: TableName,
    close_on_shutdown: bool,
}

impl BuilderBackend {
    pub fn new(pool: PgPool, table: TableName, close_on_shutdown: bool) -> Self {
        Self {
            pool,
            table,
            close_on_shutdown,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn insert_query(&self, record: LogRecord) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("INSERT INTO ");
        builder.push(self.table.quoted()).push(" (");

        let mut columns = builder.separated(", ");
        for column in COLUMNS {
            columns.push(format!("\"{column}\""));
        }
        builder.push(") ");

        builder.push_values([record], |mut row, record| {
            row.push_bind(record.name)
                .push_bind(record.level)
                .push_bind(record.hostname)
                .push_bind(record.msg)
                .push_bind(record.pid)
                .push_bind(record.time)
                .push_bind(record.content)
                .push_unseparated("::jsonb");
        });

        builder
    }
}

impl Backend for BuilderBackend {
    async fn insert(&self, record: LogRecord) -> Result<(), DbError> {
        let mut query = self.insert_query(record);
        query
            .build()
            .execute(&self.pool)
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
