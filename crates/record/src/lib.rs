//! # Log Record Crate
//!
//! This crate defines the single data structure that flows through the log
//! sink, the `LogRecord`, and the codec that produces it from one serialized
//! line written by a bunyan-style logger.
//!
//! ## Architectural Principles
//!
//! - **Layer 0 Types:** No knowledge of databases or streams. Every other crate
//!   depends on this one to agree on what a persisted row contains.
//! - **Lenient Fields, Strict Shape:** A line must be a JSON object, but any
//!   individual field may be absent or of an unexpected type; such fields are
//!   stored as NULL instead of failing the whole record.
//!
//! ## Public API
//!
//! - `LogRecord`: One decoded log entry, ready to be inserted.
//! - `decode`: Parses a raw chunk into a `LogRecord`.
//! - `CodecError`: Why a chunk could not be decoded.

pub mod codec;
pub mod error;

pub use codec::{LogRecord, decode};
pub use error::CodecError;
