//! # Log Sink Crate
//!
//! The write-stream adapter between a logging front-end and a Postgres table.
//! Serialized records go in through `LogSink::write`; `LogSink::end` drains
//! every outstanding insert before releasing the database.
//!
//! ## Architectural Principles
//!
//! - **Non-blocking Writes:** `write` decodes and queues, then returns. The
//!   outcome of the insert arrives later on the returned `PendingWrite`.
//! - **Drain Before Close:** The backend is shut down only once no insert is
//!   in flight, so an accepted record is never abandoned.
//! - **Local Failures:** A failed insert is reported to its own write only. The
//!   sink keeps accepting records and never retries.
//!
//! ## Public API
//!
//! - `LogSink`: The adapter, generic over any `database::Backend`.
//! - `SinkOptions`: Construction input (connection + table name).
//! - `SinkState`, `SinkStats`, `PendingWrite`.
//! - `SinkError`: Every way a sink operation can fail.

pub mod adapter;
pub mod error;
pub mod options;
pub mod state;
pub mod stats;
pub mod write;

pub use adapter::LogSink;
pub use configuration::{BackendKind, ConnectionSettings};
pub use database::{Backend, Connection, PgBackend};
pub use error::SinkError;
pub use options::SinkOptions;
pub use state::SinkState;
pub use stats::SinkStats;
pub use write::PendingWrite;
