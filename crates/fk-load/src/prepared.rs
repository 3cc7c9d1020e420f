//! A load plan with every statement rendered

use crate::validator::CompareStatement;
use fk_core::{LoadPlan, TableName};
use fk_sql::{BulkAppendQuery, InsertQuery, RetrieveQuery};
use std::fmt;

/// How rows reach a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatement {
    Insert(InsertQuery),
    BulkAppend(BulkAppendQuery),
}

impl WriteStatement {
    pub fn sql(&self) -> &str {
        match self {
            WriteStatement::Insert(query) => &query.sql,
            WriteStatement::BulkAppend(query) => &query.sql,
        }
    }

    /// Dataset columns supplying each written value, in statement order
    pub fn dataset_columns(&self) -> &[String] {
        match self {
            WriteStatement::Insert(query) => &query.dataset_columns,
            WriteStatement::BulkAppend(query) => &query.dataset_columns,
        }
    }
}

/// Statements for one table, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStep {
    pub table: TableName,
    pub write: WriteStatement,
    /// Absent for tables without a primary key
    pub retrieve: Option<RetrieveQuery>,
    /// Dataset columns to drop once this step's keys are merged
    pub replaced_columns: Vec<String>,
}

/// Everything a load will run, decided before the first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLoad {
    pub plan: LoadPlan,
    pub steps: Vec<PreparedStep>,
    /// Absent when validation is disabled
    pub compare: Option<CompareStatement>,
}

impl fmt::Display for PreparedLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plan)?;
        for step in &self.steps {
            writeln!(f)?;
            writeln!(f, "-- {}", step.table)?;
            writeln!(f, "{};", step.write.sql())?;
            if let Some(retrieve) = &step.retrieve {
                writeln!(f, "{};", retrieve.sql)?;
            }
        }
        if let Some(compare) = &self.compare {
            writeln!(f)?;
            writeln!(f, "-- compare")?;
            writeln!(f, "{};", compare.sql())?;
        }
        Ok(())
    }
}
