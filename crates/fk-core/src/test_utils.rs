//! Shared schema fixtures for tests

use crate::schema::{RawColumn, RawForeignKey, RawSchema, RawTable, SchemaGraph};

/// Table record with an `id` primary key followed by `columns`.
///
/// Columns are given as `(name, nullable)`.
pub fn raw_table(name: &str, columns: &[(&str, bool)]) -> RawTable {
    let mut all = vec![RawColumn::new("id", false)];
    all.extend(columns.iter().map(|(c, nullable)| RawColumn::new(*c, *nullable)));
    RawTable {
        name: name.to_string(),
        columns: all,
        primary_key: Some("id".to_string()),
    }
}

/// Table record without a primary key.
pub fn raw_keyless_table(name: &str, columns: &[(&str, bool)]) -> RawTable {
    RawTable {
        name: name.to_string(),
        columns: columns
            .iter()
            .map(|(c, nullable)| RawColumn::new(*c, *nullable))
            .collect(),
        primary_key: None,
    }
}

/// `table.column REFERENCES parent (id)`.
pub fn raw_fk(table: &str, column: &str, parent: &str) -> RawForeignKey {
    RawForeignKey {
        table: table.to_string(),
        column: column.to_string(),
        references_table: parent.to_string(),
        references_column: "id".to_string(),
    }
}

/// `purchases(id, name, amount)`
pub fn purchases_schema() -> RawSchema {
    RawSchema {
        tables: vec![raw_table("purchases", &[("name", false), ("amount", false)])],
        foreign_keys: vec![],
    }
}

/// `customers(id, name)` and `orders(id, customer_id -> customers, total)`
pub fn shop_schema() -> RawSchema {
    RawSchema {
        tables: vec![
            raw_table("orders", &[("customer_id", false), ("total", false)]),
            raw_table("customers", &[("name", false)]),
        ],
        foreign_keys: vec![raw_fk("orders", "customer_id", "customers")],
    }
}

/// `products(id, title)`, `tags(id, label)` and the keyless linking table
/// `product_tags(product_id, tag_id)`
pub fn catalog_schema() -> RawSchema {
    RawSchema {
        tables: vec![
            raw_table("products", &[("title", false)]),
            raw_table("tags", &[("label", false)]),
            raw_keyless_table("product_tags", &[("product_id", false), ("tag_id", false)]),
        ],
        foreign_keys: vec![
            raw_fk("product_tags", "product_id", "products"),
            raw_fk("product_tags", "tag_id", "tags"),
        ],
    }
}

/// Build a raw schema, panicking on error.
pub fn graph(raw: RawSchema) -> SchemaGraph {
    match SchemaGraph::build(raw) {
        Ok(schema) => schema,
        Err(e) => panic!("fixture schema failed to build: {e}"),
    }
}

/// Owned column names.
pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}
