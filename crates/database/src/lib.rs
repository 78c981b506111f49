//! # Database Crate
//!
//! This crate is the storage side of the log sink. It turns a decoded
//! `LogRecord` into one row of a PostgreSQL table.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** Encapsulates all SQL. The sink above it only sees the
//!   `Backend` trait with its two operations, `insert` and `shutdown`.
//! - **Closed Set of Backends:** `PgBackend` is either a `PoolBackend`
//!   (parameterized INSERT on a pooled connection) or a `BuilderBackend`
//!   (`sqlx::QueryBuilder`). The variant is picked once, from the shape of the
//!   `Connection` the sink is constructed with, and dispatched statically.
//! - **Asynchronous & Pooled:** Inserts share one `PgPool` and may run
//!   concurrently up to the pool's connection limit.
//!
//! ## Public API
//!
//! - `Backend`: The insert/shutdown capability.
//! - `PgBackend`, `PoolBackend`, `BuilderBackend`: The Postgres implementations.
//! - `Connection`: A descriptor or a caller-supplied pool.
//! - `TableName`: A validated, quoted target table.
//! - `connect_lazy`, `connect_options`: Pool construction from settings.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod backend;
pub mod builder;
pub mod connection;
pub mod error;
pub mod pool;
pub mod table;

pub use backend::{Backend, COLUMNS, Connection, PgBackend};
pub use builder::BuilderBackend;
pub use configuration::BackendKind;
pub use connection::{connect_lazy, connect_options};
pub use error::DbError;
pub use pool::PoolBackend;
pub use table::TableName;
