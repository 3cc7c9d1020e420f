//! fk-db - Database executor layer for fkload
//!
//! This crate provides the synchronous `Executor` trait the loader drives,
//! and its DuckDB implementation.

pub mod duckdb;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use self::duckdb::DuckDbExecutor;
pub use error::{DbError, DbResult};
pub use traits::{in_transaction, Executor};
