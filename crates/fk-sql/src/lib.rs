//! fk-sql - SQL layer for fkload
//!
//! This crate renders the INSERT, RETRIEVE and COMPARE statements a load
//! issues, parameterized by a [`SqlDialect`], and checks caller-supplied
//! compare queries with sqlparser-rs.

pub mod dialect;
pub mod error;
pub mod synth;

pub use dialect::{
    dialect_from_name, BulkAppendForm, ConflictStrategy, DuckDbDialect, PlaceholderStyle,
    PostgresDialect, SqlDialect, SqliteDialect,
};
pub use error::{SqlError, SqlResult};
pub use synth::{
    validate_custom_query, BulkAppendQuery, CompareQuery, InsertQuery, QuerySynthesizer,
    RetrieveQuery,
};
