//! fk-core - Core library for fkload
//!
//! This crate provides the schema model, dataset and value types, column
//! matching, load planning and load options shared by the other fkload
//! crates.

pub mod config;
pub mod dataset;
pub mod error;
pub mod matcher;
pub mod names;
pub mod plan;
pub mod schema;
pub mod sql_utils;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod value;

pub use config::{InsertMode, LoadOptions, OnConflict};
pub use dataset::{Dataset, RowCounts};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use matcher::{ColumnMapping, ColumnMatcher, ColumnOverrides, MappedColumn, MappingSource};
pub use names::{ColumnName, TableName};
pub use plan::{LoadOrderResolver, LoadPlan, LoadStep};
pub use schema::{
    Column, Edge, ForeignKey, RawColumn, RawForeignKey, RawSchema, RawTable, SchemaGraph, Table,
};
pub use value::{Value, ValueKind};
