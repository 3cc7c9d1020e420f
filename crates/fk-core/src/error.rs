//! Error types for fk-core

use thiserror::Error;

/// Coarse classification shared by every error type in the workspace.
///
/// Callers branch on the kind rather than on individual variants; every
/// kind is fatal to the current call and none is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed schema, FK naming inconsistency, or a cycle found at build time
    Schema,
    /// A required db column has no dataset mapping, or a mapping is ambiguous
    MissingColumn,
    /// A cycle among the tables touched by one load call
    CyclicSchema,
    /// A retrieve-merge multiplied rows while duplication was disallowed
    Duplication,
    /// Touched tables do not form a single join graph
    Connectivity,
    /// Stored data does not match the input
    Validation,
    /// Failure reported by the database executor
    Executor,
    /// Invalid or unreadable load options
    Config,
    /// Malformed tabular input or a merge that lost keys
    Data,
}

/// Core error type for fkload
#[derive(Error, Debug)]
pub enum CoreError {
    /// SC001: Table lookup failed
    #[error("[SC001] Table '{table}' does not appear in the schema")]
    TableNotFound { table: String },

    /// SC002: Two introspected tables share a name
    #[error("[SC002] Duplicate table name in schema: {table}")]
    DuplicateTable { table: String },

    /// SC003: Two columns of one table share a name
    #[error("[SC003] Duplicate column '{column}' on table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// SC004: Foreign key references a table that is not in the schema
    #[error("[SC004] Foreign key {table}.{column} references unknown table '{referenced}'")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced: String,
    },

    /// SC005: Foreign key references something other than a primary key
    #[error("[SC005] Foreign key {table}.{column} references {referenced}.{referenced_column}, which is not the primary key of '{referenced}'")]
    ReferenceNotPrimaryKey {
        table: String,
        column: String,
        referenced: String,
        referenced_column: String,
    },

    /// SC006: Table references itself
    #[error("[SC006] Foreign key {table}.{column} references its own table")]
    SelfReference { table: String, column: String },

    /// SC007: Children reference one primary key under different column names
    #[error("[SC007] Table '{referenced}' is referenced under inconsistent foreign key names: {names}. All references to one primary key must use the same column name")]
    InconsistentForeignKeyNames { referenced: String, names: String },

    /// SC008: Schema contains a foreign-key cycle
    #[error("[SC008] Schema contains a foreign key cycle: {cycle}")]
    CircularSchema { cycle: String },

    /// SC009: Schema has no tables
    #[error("[SC009] Database does not contain any tables")]
    EmptySchema,

    /// SC010: Table has neither columns nor foreign keys
    #[error("[SC010] Table '{table}' has no columns")]
    EmptyTable { table: String },

    /// SC011: Operation needs a primary key the table does not have
    #[error("[SC011] Table '{table}' has no primary key, ids cannot be retrieved from it")]
    NoPrimaryKey { table: String },

    /// SC012: Empty identifier in raw schema records
    #[error("[SC012] Empty name in {context}")]
    EmptyName { context: String },

    /// SC013: Foreign key or primary key names a column the table does not have
    #[error("[SC013] Key column '{column}' does not exist on table '{table}'")]
    UnknownKeyColumn { table: String, column: String },

    /// MC001: Dataset column matches columns on several touched tables
    #[error("[MC001] Column '{column}' is ambiguous, it appears on tables {tables}. Add an override of the form <table>.<column>")]
    AmbiguousColumn { column: String, tables: String },

    /// MC002: Required db column has no dataset source
    #[error("[MC002] Required column {table}.{column} is not provided by the dataset or the column overrides")]
    MissingRequiredColumn { table: String, column: String },

    /// MC003: Override key is malformed or names an unknown column
    #[error("[MC003] Invalid column override '{key}': {reason}")]
    InvalidOverride { key: String, reason: String },

    /// MC004: Override points at a dataset column that does not exist
    #[error("[MC004] Override for {table}.{column} names dataset column '{dataset_column}', which is not in the dataset")]
    OverrideColumnNotInDataset {
        table: String,
        column: String,
        dataset_column: String,
    },

    /// MC005: A named table has no column the dataset can fill
    #[error("[MC005] None of the dataset columns {columns} exist on table '{table}'")]
    NoMatchingColumns { table: String, columns: String },

    /// MC006: The dataset matches no table at all
    #[error("[MC006] None of the dataset columns {columns} match any table in the schema")]
    NothingToLoad { columns: String },

    /// CY001: Tables touched by a load depend on each other cyclically
    #[error("[CY001] Cyclic dependency among loaded tables: {cycle}")]
    CyclicLoadOrder { cycle: String },

    /// CN001: Touched tables cannot be joined into a single compare query
    #[error("[CN001] Automatic compare query needs all tables to be joined, but found isolated groups: {components}. Provide a compare query or disable validation")]
    DisconnectedTables { components: String },

    /// DS001: Dataset has no column with this name
    #[error("[DS001] Column '{column}' not found in dataset")]
    DatasetColumnNotFound { column: String },

    /// DS002: Row width does not match the column count
    #[error("[DS002] Row {row} has {found} values, expected {expected}")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// DS003: Dataset declares the same column twice
    #[error("[DS003] Duplicate dataset column: {column}")]
    DuplicateDatasetColumn { column: String },

    /// CF001: Options file not found
    #[error("[CF001] Options file not found: {path}")]
    ConfigNotFound { path: String },

    /// CF002: Options file could not be parsed
    #[error("[CF002] Failed to parse load options: {message}")]
    ConfigParseError { message: String },

    /// CF003: Options are well-formed but inconsistent
    #[error("[CF003] Invalid load options: {message}")]
    ConfigInvalid { message: String },

    /// CF004: IO error with file path context
    #[error("[CF004] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

impl CoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TableNotFound { .. }
            | CoreError::DuplicateTable { .. }
            | CoreError::DuplicateColumn { .. }
            | CoreError::UnknownReferencedTable { .. }
            | CoreError::ReferenceNotPrimaryKey { .. }
            | CoreError::SelfReference { .. }
            | CoreError::InconsistentForeignKeyNames { .. }
            | CoreError::CircularSchema { .. }
            | CoreError::EmptySchema
            | CoreError::EmptyTable { .. }
            | CoreError::NoPrimaryKey { .. }
            | CoreError::EmptyName { .. }
            | CoreError::UnknownKeyColumn { .. } => ErrorKind::Schema,
            CoreError::AmbiguousColumn { .. }
            | CoreError::MissingRequiredColumn { .. }
            | CoreError::InvalidOverride { .. }
            | CoreError::OverrideColumnNotInDataset { .. }
            | CoreError::NoMatchingColumns { .. }
            | CoreError::NothingToLoad { .. } => ErrorKind::MissingColumn,
            CoreError::CyclicLoadOrder { .. } => ErrorKind::CyclicSchema,
            CoreError::DisconnectedTables { .. } => ErrorKind::Connectivity,
            CoreError::DatasetColumnNotFound { .. }
            | CoreError::RowWidthMismatch { .. }
            | CoreError::DuplicateDatasetColumn { .. } => ErrorKind::Data,
            CoreError::ConfigNotFound { .. }
            | CoreError::ConfigParseError { .. }
            | CoreError::ConfigInvalid { .. }
            | CoreError::IoWithPath { .. } => ErrorKind::Config,
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Render a list of names as `'a', 'b'` for error messages.
pub(crate) fn quoted_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| format!("'{}'", s.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
