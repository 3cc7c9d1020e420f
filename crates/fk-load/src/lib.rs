//! fk-load - Load orchestration for fkload
//!
//! This crate drives a full load: it plans against the schema graph,
//! writes each touched table in dependency order, merges the generated
//! keys back into the working dataset, validates the round trip and
//! commits, all inside a single transaction.

pub mod error;
pub mod loader;
pub mod merge;
pub mod prepared;
pub mod validator;

pub use error::{LoadError, LoadResult};
pub use loader::{LoadOutcome, Loader};
pub use merge::merge_keys;
pub use prepared::{PreparedLoad, PreparedStep, WriteStatement};
pub use validator::{compare_datasets, CompareMode, CompareStatement, ValidationReport, Validator};
