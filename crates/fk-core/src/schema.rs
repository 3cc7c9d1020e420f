//! Schema model: tables, columns and foreign keys as a dependency graph
//!
//! A [`SchemaGraph`] is built once per session from raw introspection
//! records and validated eagerly. It is never refreshed implicitly; callers
//! rebuild it after out-of-band schema changes.

use crate::error::{quoted_list, CoreError, CoreResult};
use crate::names::{ColumnName, TableName};
use crate::plan::deterministic_order;
use crate::config::default_true;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Column record as reported by introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawColumn {
    pub name: String,

    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Whether the database fills the column when an INSERT omits it
    #[serde(default)]
    pub has_default: bool,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
            has_default: false,
        }
    }
}

/// Table record as reported by introspection.
///
/// `columns` lists every column, key columns included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<RawColumn>,

    #[serde(default)]
    pub primary_key: Option<String>,
}

/// Foreign-key record: `table.column REFERENCES references_table (references_column)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawForeignKey {
    pub table: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// Everything introspection returns about a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchema {
    #[serde(default)]
    pub tables: Vec<RawTable>,

    #[serde(default)]
    pub foreign_keys: Vec<RawForeignKey>,
}

/// A non-primary-key column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: ColumnName,
    pub table: TableName,
    pub nullable: bool,
    pub has_default: bool,
}

impl Column {
    /// Whether an INSERT must supply a value for this column.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.has_default
    }
}

/// A foreign key owned by a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Column on the owning table
    pub column: ColumnName,
    /// Referenced table
    pub references: TableName,
    /// Primary key of the referenced table
    pub referenced_key: ColumnName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: TableName,
    /// Every column except the primary key, in introspection order
    pub columns: Vec<Column>,
    pub primary_key: Option<ColumnName>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.foreign_key(column).is_some()
    }

    /// Columns that are neither primary nor foreign keys.
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !self.is_foreign_key(&c.name))
    }

    /// A table made only of foreign keys, linking other tables many-to-many.
    pub fn is_linking(&self) -> bool {
        !self.foreign_keys.is_empty() && self.data_columns().next().is_none()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table {} (", self.name)?;
        if let Some(pk) = &self.primary_key {
            writeln!(f, "\t{pk} PRIMARY KEY")?;
        }
        for column in &self.columns {
            let null = if column.nullable { "" } else { " NOT NULL" };
            match self.foreign_key(&column.name) {
                Some(fk) => writeln!(
                    f,
                    "\t{}{null} REFERENCES {} ({})",
                    column.name, fk.references, fk.referenced_key
                )?,
                None => writeln!(f, "\t{}{null}", column.name)?,
            }
        }
        write!(f, ")")
    }
}

/// One foreign-key edge: `child.column` references `parent.referenced_key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub child: TableName,
    pub column: ColumnName,
    pub parent: TableName,
    pub referenced_key: ColumnName,
}

/// The full schema plus its foreign-key dependency graph.
#[derive(Debug)]
pub struct SchemaGraph {
    tables: BTreeMap<TableName, Table>,

    /// Edges go from referenced table to referencing table, so a
    /// topological walk yields parents first.
    graph: DiGraph<TableName, ColumnName>,

    node_map: HashMap<TableName, NodeIndex>,
}

impl SchemaGraph {
    /// Build and validate a schema from raw introspection records.
    pub fn build(raw: RawSchema) -> CoreResult<Self> {
        let mut tables = BTreeMap::new();

        for raw_table in raw.tables {
            let table = build_table(raw_table)?;
            if tables.contains_key(&table.name) {
                return Err(CoreError::DuplicateTable {
                    table: table.name.to_string(),
                });
            }
            tables.insert(table.name.clone(), table);
        }

        for raw_fk in raw.foreign_keys {
            attach_foreign_key(&mut tables, raw_fk)?;
        }

        for table in tables.values() {
            if table.columns.is_empty() {
                return Err(CoreError::EmptyTable {
                    table: table.name.to_string(),
                });
            }
        }

        check_naming_consistency(&tables)?;

        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        for name in tables.keys() {
            node_map.insert(name.clone(), graph.add_node(name.clone()));
        }
        for table in tables.values() {
            for fk in &table.foreign_keys {
                graph.add_edge(
                    node_map[&fk.references],
                    node_map[&table.name],
                    fk.column.clone(),
                );
            }
        }

        let schema = Self {
            tables,
            graph,
            node_map,
        };
        schema.validate()?;

        log::debug!("Built schema with {} tables", schema.tables.len());
        Ok(schema)
    }

    /// Validate the graph has no cycles
    fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularSchema {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a cycle path starting from a node for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> CoreResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| CoreError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// All tables, ordered by name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    pub fn columns(&self, table: &str) -> CoreResult<&[Column]> {
        Ok(&self.table(table)?.columns)
    }

    pub fn foreign_keys(&self, table: &str) -> CoreResult<&[ForeignKey]> {
        Ok(&self.table(table)?.foreign_keys)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Fail with `EmptySchema` when there is nothing to load into.
    pub fn ensure_not_empty(&self) -> CoreResult<()> {
        if self.is_empty() {
            Err(CoreError::EmptySchema)
        } else {
            Ok(())
        }
    }

    /// Name under which this table's primary key is known to its children.
    ///
    /// Unique by the naming-consistency invariant; tables nobody references
    /// fall back to `<table>_id`.
    pub fn key_alias(&self, table: &str) -> CoreResult<String> {
        let table = self.table(table)?;
        let idx = self.node_map[&table.name];
        Ok(self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().to_string())
            .next()
            .unwrap_or_else(|| format!("{}_id", table.name)))
    }

    /// Tables this table references.
    pub fn dependencies(&self, table: &str) -> Vec<TableName> {
        self.neighbors(table, Direction::Incoming)
    }

    /// Tables that reference this table.
    pub fn dependents(&self, table: &str) -> Vec<TableName> {
        self.neighbors(table, Direction::Outgoing)
    }

    fn neighbors(&self, table: &str, direction: Direction) -> Vec<TableName> {
        let Some(&idx) = self.node_map.get(table) else {
            return Vec::new();
        };
        let names: BTreeSet<TableName> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Incoming => self.graph[e.source()].clone(),
                Direction::Outgoing => self.graph[e.target()].clone(),
            })
            .collect();
        names.into_iter().collect()
    }

    /// Foreign-key edges with both ends inside `tables`, sorted.
    pub fn edges_within(&self, tables: &BTreeSet<TableName>) -> Vec<Edge> {
        let mut edges: Vec<Edge> = tables
            .iter()
            .filter_map(|name| self.tables.get(name))
            .flat_map(|table| {
                table
                    .foreign_keys
                    .iter()
                    .filter(|fk| tables.contains(&fk.references))
                    .map(|fk| Edge {
                        child: table.name.clone(),
                        column: fk.column.clone(),
                        parent: fk.references.clone(),
                        referenced_key: fk.referenced_key.clone(),
                    })
            })
            .collect();
        edges.sort();
        edges
    }

    /// Weakly connected groups of `tables`, following edges inside the set only.
    pub fn join_components(&self, tables: &BTreeSet<TableName>) -> Vec<BTreeSet<TableName>> {
        let edges = self.edges_within(tables);
        let mut adjacency: BTreeMap<&TableName, BTreeSet<&TableName>> =
            tables.iter().map(|t| (t, BTreeSet::new())).collect();
        for edge in &edges {
            if let Some(set) = adjacency.get_mut(&edge.child) {
                set.insert(&edge.parent);
            }
            if let Some(set) = adjacency.get_mut(&edge.parent) {
                set.insert(&edge.child);
            }
        }

        let mut seen: HashSet<&TableName> = HashSet::new();
        let mut components = Vec::new();
        for start in tables {
            if !seen.insert(start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                component.insert(current.clone());
                for &next in &adjacency[current] {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Fail with `DisconnectedTables` unless `tables` form one join graph.
    pub fn ensure_joinable(&self, tables: &BTreeSet<TableName>) -> CoreResult<()> {
        let components = self.join_components(tables);
        if components.len() <= 1 {
            return Ok(());
        }
        let rendered = components
            .iter()
            .map(|c| format!("[{}]", quoted_list(c)))
            .collect::<Vec<_>>()
            .join(", ");
        Err(CoreError::DisconnectedTables {
            components: rendered,
        })
    }

    /// Every table, parents before children, ties broken by name.
    pub fn topological_order(&self) -> CoreResult<Vec<TableName>> {
        let all: BTreeSet<TableName> = self.tables.keys().cloned().collect();
        deterministic_order(self, &all)
    }
}

impl fmt::Display for SchemaGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks: Vec<String> = self.tables.values().map(ToString::to_string).collect();
        f.write_str(&blocks.join("\n"))
    }
}

fn table_name(raw: &str, context: &str) -> CoreResult<TableName> {
    TableName::try_new(raw).ok_or_else(|| CoreError::EmptyName {
        context: context.to_string(),
    })
}

fn column_name(raw: &str, context: &str) -> CoreResult<ColumnName> {
    ColumnName::try_new(raw).ok_or_else(|| CoreError::EmptyName {
        context: context.to_string(),
    })
}

fn build_table(raw: RawTable) -> CoreResult<Table> {
    let name = table_name(&raw.name, "table name")?;
    let primary_key = raw
        .primary_key
        .as_deref()
        .map(|pk| column_name(pk, &format!("primary key of '{name}'")))
        .transpose()?;

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(raw.columns.len());
    let mut found_pk = false;
    for raw_column in raw.columns {
        let column = column_name(&raw_column.name, &format!("column of '{name}'"))?;
        if !seen.insert(column.clone()) {
            return Err(CoreError::DuplicateColumn {
                table: name.to_string(),
                column: column.to_string(),
            });
        }
        if primary_key.as_ref() == Some(&column) {
            found_pk = true;
            continue;
        }
        columns.push(Column {
            name: column,
            table: name.clone(),
            nullable: raw_column.nullable,
            has_default: raw_column.has_default,
        });
    }

    if let Some(pk) = &primary_key {
        if !found_pk {
            return Err(CoreError::UnknownKeyColumn {
                table: name.to_string(),
                column: pk.to_string(),
            });
        }
    }

    Ok(Table {
        name,
        columns,
        primary_key,
        foreign_keys: Vec::new(),
    })
}

fn attach_foreign_key(
    tables: &mut BTreeMap<TableName, Table>,
    raw: RawForeignKey,
) -> CoreResult<()> {
    let child = table_name(&raw.table, "foreign key table")?;
    let column = column_name(&raw.column, "foreign key column")?;
    let parent = table_name(&raw.references_table, "referenced table")?;
    let referenced_key = column_name(&raw.references_column, "referenced column")?;

    if child == parent {
        return Err(CoreError::SelfReference {
            table: child.to_string(),
            column: column.to_string(),
        });
    }

    let parent_key = match tables.get(&parent) {
        Some(table) => table.primary_key.clone(),
        None => {
            return Err(CoreError::UnknownReferencedTable {
                table: child.to_string(),
                column: column.to_string(),
                referenced: parent.to_string(),
            })
        }
    };
    if parent_key.as_ref() != Some(&referenced_key) {
        return Err(CoreError::ReferenceNotPrimaryKey {
            table: child.to_string(),
            column: column.to_string(),
            referenced: parent.to_string(),
            referenced_column: referenced_key.to_string(),
        });
    }

    let table = tables
        .get_mut(&child)
        .ok_or_else(|| CoreError::TableNotFound {
            table: child.to_string(),
        })?;
    if !table.has_column(&column) {
        return Err(CoreError::UnknownKeyColumn {
            table: child.to_string(),
            column: column.to_string(),
        });
    }
    // composite or repeated introspection rows collapse to one key per column
    if !table.is_foreign_key(&column) {
        table.foreign_keys.push(ForeignKey {
            column,
            references: parent,
            referenced_key,
        });
    }
    Ok(())
}

/// All foreign keys referencing one primary key must share a column name.
fn check_naming_consistency(tables: &BTreeMap<TableName, Table>) -> CoreResult<()> {
    let mut names: BTreeMap<&TableName, BTreeMap<&ColumnName, BTreeSet<&TableName>>> =
        BTreeMap::new();
    for table in tables.values() {
        for fk in &table.foreign_keys {
            names
                .entry(&fk.references)
                .or_default()
                .entry(&fk.column)
                .or_default()
                .insert(&table.name);
        }
    }

    for (referenced, by_name) in names {
        if by_name.len() > 1 {
            let rendered = by_name
                .iter()
                .map(|(column, children)| format!("'{column}' ({})", quoted_list(children)))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CoreError::InconsistentForeignKeyNames {
                referenced: referenced.to_string(),
                names: rendered,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
