//! Load planning: which tables a load touches and the order they are written in

use crate::error::{quoted_list, CoreError, CoreResult};
use crate::matcher::{ColumnMapping, ColumnMatcher, ColumnOverrides};
use crate::names::TableName;
use crate::schema::SchemaGraph;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;

/// Order `tables` parents first, following foreign keys inside the set.
///
/// Ties are broken by ascending table name, so the order is stable for a
/// given schema.
pub fn deterministic_order(
    schema: &SchemaGraph,
    tables: &BTreeSet<TableName>,
) -> CoreResult<Vec<TableName>> {
    let edges: Vec<(TableName, TableName)> = schema
        .edges_within(tables)
        .into_iter()
        .map(|e| (e.parent, e.child))
        .collect();
    order_tables(tables, &edges)
}

/// Kahn's algorithm over `(parent, child)` edges with a sorted ready set.
///
/// Edges with an end outside `tables` are ignored. A cycle fails with
/// `CyclicLoadOrder` naming one cycle among the remaining tables.
pub fn order_tables(
    tables: &BTreeSet<TableName>,
    edges: &[(TableName, TableName)],
) -> CoreResult<Vec<TableName>> {
    let mut in_degree: BTreeMap<&TableName, usize> = tables.iter().map(|t| (t, 0)).collect();
    let mut children: BTreeMap<&TableName, BTreeSet<&TableName>> = BTreeMap::new();
    let mut parents: BTreeMap<&TableName, BTreeSet<&TableName>> = BTreeMap::new();

    for (parent, child) in edges {
        if !tables.contains(parent) || !tables.contains(child) {
            continue;
        }
        if children.entry(parent).or_default().insert(child) {
            parents.entry(child).or_default().insert(parent);
            if let Some(degree) = in_degree.get_mut(child) {
                *degree += 1;
            }
        }
    }

    let mut ready: BTreeSet<&TableName> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&name, _)| name)
        .collect();
    let mut order = Vec::with_capacity(tables.len());

    while let Some(next) = ready.pop_first() {
        order.push(next.clone());
        for &child in children.get(next).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(child);
                }
            }
        }
    }

    if order.len() < tables.len() {
        let remaining: BTreeSet<&TableName> = in_degree
            .iter()
            .filter(|(_, &degree)| degree > 0)
            .map(|(&name, _)| name)
            .collect();
        return Err(CoreError::CyclicLoadOrder {
            cycle: render_cycle(&remaining, &parents),
        });
    }

    Ok(order)
}

/// Walk parent links among the stuck tables until one repeats.
///
/// Every stuck table still has a stuck parent, so the walk always closes.
fn render_cycle(
    remaining: &BTreeSet<&TableName>,
    parents: &BTreeMap<&TableName, BTreeSet<&TableName>>,
) -> String {
    let Some(&start) = remaining.first() else {
        return String::new();
    };
    let mut walk = vec![start];
    let mut seen = HashSet::from([start]);
    let mut current = start;

    loop {
        let next = parents
            .get(current)
            .and_then(|p| p.iter().find(|t| remaining.contains(*t)));
        let Some(&next) = next else { break };
        if !seen.insert(next) {
            let from = walk.iter().position(|t| *t == next).unwrap_or(0);
            // walk followed child -> parent; render parent -> child
            let mut cycle: Vec<&TableName> = walk[from..].to_vec();
            cycle.reverse();
            cycle.insert(0, next);
            return cycle
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
        }
        walk.push(next);
        current = next;
    }

    quoted_list(remaining)
}

/// Decides which tables a load touches and in what order they are written.
pub struct LoadOrderResolver;

impl LoadOrderResolver {
    /// Parents-first order of `touched`; a dependency edge counts only when
    /// both of its tables are touched.
    pub fn resolve(
        schema: &SchemaGraph,
        touched: &BTreeSet<TableName>,
    ) -> CoreResult<Vec<TableName>> {
        let order = deterministic_order(schema, touched)?;
        log::debug!(
            "Load order: {}",
            order
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Ok(order)
    }

    /// Tables a dataset writes to.
    ///
    /// Without `targets`, every table owning a non-key column the dataset
    /// matches (by name or override) is touched. With `targets`, the named
    /// tables are touched plus the parents reachable through their foreign
    /// keys whose columns the dataset carries. Either way, linking tables
    /// whose referenced tables are all touched are added.
    pub fn touched_tables(
        schema: &SchemaGraph,
        matcher: &ColumnMatcher<'_>,
        dataset_columns: &[String],
        targets: Option<&[String]>,
    ) -> CoreResult<BTreeSet<TableName>> {
        schema.ensure_not_empty()?;
        let overrides = matcher.overrides();
        overrides.validate(schema, dataset_columns)?;
        let unclaimed = matcher.unclaimed(dataset_columns);

        let mut touched = overrides.tables();
        match targets {
            Some(names) if !names.is_empty() => {
                for name in names {
                    touched.insert(schema.table(name)?.name.clone());
                }
                let mut queue: VecDeque<TableName> = touched.iter().cloned().collect();
                while let Some(current) = queue.pop_front() {
                    let table = schema.table(&current)?;
                    for fk in &table.foreign_keys {
                        if touched.contains(&fk.references)
                            || unclaimed.contains(&fk.column.as_str())
                            || overrides.get(&table.name, &fk.column).is_some()
                        {
                            continue;
                        }
                        let parent = schema.table(&fk.references)?;
                        if parent
                            .data_columns()
                            .any(|c| unclaimed.contains(&c.name.as_str()))
                        {
                            touched.insert(parent.name.clone());
                            queue.push_back(parent.name.clone());
                        }
                    }
                }
            }
            _ => {
                let all: BTreeSet<TableName> = schema.table_names().cloned().collect();
                for column in &unclaimed {
                    let owners = matcher.tables_with_data_column(column, &all);
                    match owners.as_slice() {
                        [] => {}
                        [owner] => {
                            touched.insert(owner.clone());
                        }
                        _ => {
                            return Err(CoreError::AmbiguousColumn {
                                column: column.to_string(),
                                tables: quoted_list(&owners),
                            })
                        }
                    }
                }
            }
        }

        for name in schema.topological_order()? {
            if touched.contains(&name) {
                continue;
            }
            let table = schema.table(&name)?;
            if table.is_linking()
                && table
                    .foreign_keys
                    .iter()
                    .all(|fk| touched.contains(&fk.references))
            {
                log::debug!("Adding linking table '{name}'");
                touched.insert(name);
            }
        }

        if touched.is_empty() {
            return Err(CoreError::NothingToLoad {
                columns: quoted_list(dataset_columns),
            });
        }
        Ok(touched)
    }
}

/// One table of a load plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStep {
    pub table: TableName,
    pub mapping: ColumnMapping,
    /// Dataset column that receives this table's primary keys; `None` for
    /// tables without a primary key
    pub key_alias: Option<String>,
}

impl LoadStep {
    /// Whether ids are fetched back after the insert.
    pub fn retrieves_ids(&self) -> bool {
        self.key_alias.is_some()
    }
}

/// Everything decided before the first write of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    steps: Vec<LoadStep>,
}

impl LoadPlan {
    /// Match columns, pick tables and order them.
    ///
    /// Every matching and ordering error surfaces here, before any query
    /// is issued.
    pub fn build(
        schema: &SchemaGraph,
        dataset_columns: &[String],
        overrides: &ColumnOverrides,
        targets: Option<&[String]>,
    ) -> CoreResult<Self> {
        let matcher = ColumnMatcher::new(schema, overrides);
        let touched =
            LoadOrderResolver::touched_tables(schema, &matcher, dataset_columns, targets)?;
        let order = LoadOrderResolver::resolve(schema, &touched)?;
        let mut mappings: BTreeMap<TableName, ColumnMapping> = matcher
            .resolve(dataset_columns, &touched)?
            .into_iter()
            .map(|m| (m.table.clone(), m))
            .collect();

        let mut aliases: BTreeMap<String, TableName> = BTreeMap::new();
        let mut steps = Vec::with_capacity(order.len());
        for table in order {
            let key_alias = match schema.table(&table)?.primary_key {
                Some(_) => Some(schema.key_alias(&table)?),
                None => None,
            };
            if let Some(alias) = &key_alias {
                if dataset_columns.iter().any(|c| c == alias) {
                    return Err(CoreError::AmbiguousColumn {
                        column: alias.clone(),
                        tables: format!("the dataset and the keys of '{table}'"),
                    });
                }
                if let Some(other) = aliases.insert(alias.clone(), table.clone()) {
                    return Err(CoreError::AmbiguousColumn {
                        column: alias.clone(),
                        tables: quoted_list([other.as_str(), table.as_str()]),
                    });
                }
            }
            let mapping = mappings
                .remove(&table)
                .ok_or_else(|| CoreError::TableNotFound {
                    table: table.to_string(),
                })?;
            steps.push(LoadStep {
                table,
                mapping,
                key_alias,
            });
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[LoadStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Tables in load order.
    pub fn tables(&self) -> Vec<&TableName> {
        self.steps.iter().map(|s| &s.table).collect()
    }

    pub fn touched(&self) -> BTreeSet<TableName> {
        self.steps.iter().map(|s| s.table.clone()).collect()
    }

    pub fn step(&self, table: &str) -> Option<&LoadStep> {
        self.steps.iter().find(|s| s.table == table)
    }
}

impl fmt::Display for LoadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            let columns: Vec<String> = step
                .mapping
                .columns()
                .iter()
                .map(|c| {
                    if c.db_column == c.dataset_column.as_str() {
                        c.db_column.to_string()
                    } else {
                        format!("{} <- {}", c.db_column, c.dataset_column)
                    }
                })
                .collect();
            write!(f, "{}. {} ({})", i + 1, step.table, columns.join(", "))?;
            if let Some(alias) = &step.key_alias {
                write!(f, " -> {alias}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
