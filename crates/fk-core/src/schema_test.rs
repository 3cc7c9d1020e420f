use super::*;
use crate::test_utils::{catalog_schema, graph, raw_fk, raw_keyless_table, raw_table, shop_schema};

fn names(items: &[TableName]) -> Vec<&str> {
    items.iter().map(|t| t.as_str()).collect()
}

#[test]
fn test_build_shop_schema() {
    let schema = graph(shop_schema());

    let orders = schema.table("orders").unwrap();
    assert_eq!(orders.primary_key.as_deref(), Some("id"));
    assert_eq!(orders.columns.len(), 2);
    assert!(orders.is_foreign_key("customer_id"));
    assert_eq!(
        orders.data_columns().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["total"]
    );
    assert_eq!(names(&schema.dependencies("orders")), vec!["customers"]);
    assert_eq!(names(&schema.dependents("customers")), vec!["orders"]);
    assert!(schema.dependencies("customers").is_empty());
}

#[test]
fn test_primary_key_is_not_a_column() {
    let schema = graph(shop_schema());
    let customers = schema.columns("customers").unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].name, "name");
    assert!(customers[0].is_required());
}

#[test]
fn test_required_column_with_default() {
    let mut raw = shop_schema();
    raw.tables[1].columns[1].has_default = true;
    let schema = graph(raw);
    assert!(!schema.columns("customers").unwrap()[0].is_required());
}

#[test]
fn test_unknown_table() {
    let schema = graph(shop_schema());
    assert!(matches!(
        schema.table("invoices"),
        Err(CoreError::TableNotFound { .. })
    ));
}

#[test]
fn test_circular_schema() {
    let raw = RawSchema {
        tables: vec![
            raw_table("a", &[("b_id", true)]),
            raw_table("b", &[("a_id", true)]),
        ],
        foreign_keys: vec![raw_fk("a", "b_id", "b"), raw_fk("b", "a_id", "a")],
    };
    let err = SchemaGraph::build(raw).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
    match err {
        CoreError::CircularSchema { cycle } => {
            assert!(cycle.contains('a') && cycle.contains('b'), "{cycle}");
        }
        other => panic!("expected CircularSchema, got {other}"),
    }
}

#[test]
fn test_inconsistent_foreign_key_names() {
    let raw = RawSchema {
        tables: vec![
            raw_table("customers", &[("name", false)]),
            raw_table("orders", &[("cust_id", false)]),
            raw_table("invoices", &[("customer_id", false)]),
        ],
        foreign_keys: vec![
            raw_fk("orders", "cust_id", "customers"),
            raw_fk("invoices", "customer_id", "customers"),
        ],
    };
    let err = SchemaGraph::build(raw).unwrap_err();
    match err {
        CoreError::InconsistentForeignKeyNames { referenced, names } => {
            assert_eq!(referenced, "customers");
            assert!(names.contains("cust_id"));
            assert!(names.contains("customer_id"));
        }
        other => panic!("expected InconsistentForeignKeyNames, got {other}"),
    }
}

#[test]
fn test_duplicate_table() {
    let raw = RawSchema {
        tables: vec![
            raw_table("customers", &[("name", false)]),
            raw_table("customers", &[("email", false)]),
        ],
        foreign_keys: vec![],
    };
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::DuplicateTable { .. })
    ));
}

#[test]
fn test_duplicate_column() {
    let raw = RawSchema {
        tables: vec![raw_table("customers", &[("name", false), ("name", true)])],
        foreign_keys: vec![],
    };
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::DuplicateColumn { .. })
    ));
}

#[test]
fn test_self_reference() {
    let raw = RawSchema {
        tables: vec![raw_table("employees", &[("manager_id", true)])],
        foreign_keys: vec![raw_fk("employees", "manager_id", "employees")],
    };
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::SelfReference { .. })
    ));
}

#[test]
fn test_reference_to_unknown_table() {
    let raw = RawSchema {
        tables: vec![raw_table("orders", &[("customer_id", false)])],
        foreign_keys: vec![raw_fk("orders", "customer_id", "customers")],
    };
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::UnknownReferencedTable { .. })
    ));
}

#[test]
fn test_reference_to_non_primary_key() {
    let mut raw = shop_schema();
    raw.foreign_keys[0].references_column = "name".to_string();
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::ReferenceNotPrimaryKey { .. })
    ));
}

#[test]
fn test_foreign_key_on_missing_column() {
    let mut raw = shop_schema();
    raw.foreign_keys[0].column = "client_id".to_string();
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::UnknownKeyColumn { .. })
    ));
}

#[test]
fn test_primary_key_not_in_columns() {
    let mut raw = shop_schema();
    raw.tables[1].primary_key = Some("customer_key".to_string());
    // orders references customers.id, but the key check on customers fires first
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::UnknownKeyColumn { .. })
    ));
}

#[test]
fn test_table_with_only_a_primary_key() {
    let raw = RawSchema {
        tables: vec![raw_table("counters", &[])],
        foreign_keys: vec![],
    };
    assert!(matches!(
        SchemaGraph::build(raw),
        Err(CoreError::EmptyTable { .. })
    ));
}

#[test]
fn test_empty_schema() {
    let schema = SchemaGraph::build(RawSchema::default()).unwrap();
    assert!(schema.is_empty());
    assert!(matches!(
        schema.ensure_not_empty(),
        Err(CoreError::EmptySchema)
    ));
}

#[test]
fn test_key_alias_uses_foreign_key_name() {
    let schema = graph(shop_schema());
    assert_eq!(schema.key_alias("customers").unwrap(), "customer_id");
    assert_eq!(schema.key_alias("orders").unwrap(), "orders_id");
}

#[test]
fn test_linking_table() {
    let schema = graph(catalog_schema());
    assert!(schema.table("product_tags").unwrap().is_linking());
    assert!(!schema.table("products").unwrap().is_linking());
    assert_eq!(
        names(&schema.dependencies("product_tags")),
        vec!["products", "tags"]
    );
}

#[test]
fn test_topological_order_breaks_ties_by_name() {
    let schema = graph(catalog_schema());
    let order = schema.topological_order().unwrap();
    assert_eq!(names(&order), vec!["products", "tags", "product_tags"]);
}

#[test]
fn test_join_components() {
    let schema = graph(catalog_schema());

    let linked: BTreeSet<TableName> = schema.table_names().cloned().collect();
    assert_eq!(schema.join_components(&linked).len(), 1);
    assert!(schema.ensure_joinable(&linked).is_ok());

    let split: BTreeSet<TableName> =
        [TableName::new("products"), TableName::new("tags")].into();
    assert_eq!(schema.join_components(&split).len(), 2);
    let err = schema.ensure_joinable(&split).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Connectivity);
}

#[test]
fn test_edges_within_ignores_outside_tables() {
    let schema = graph(catalog_schema());
    let tables: BTreeSet<TableName> =
        [TableName::new("products"), TableName::new("product_tags")].into();
    let edges = schema.edges_within(&tables);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].child, "product_tags");
    assert_eq!(edges[0].parent, "products");
    assert_eq!(edges[0].column, "product_id");
}

#[test]
fn test_repeated_foreign_key_rows_collapse() {
    let mut raw = shop_schema();
    raw.foreign_keys.push(raw_fk("orders", "customer_id", "customers"));
    let schema = graph(raw);
    assert_eq!(schema.foreign_keys("orders").unwrap().len(), 1);
}

#[test]
fn test_display() {
    let schema = graph(shop_schema());
    let rendered = schema.to_string();
    assert!(rendered.contains("Table customers ("));
    assert!(rendered.contains("\tid PRIMARY KEY"));
    assert!(rendered.contains("\tcustomer_id NOT NULL REFERENCES customers (id)"));
}

#[test]
fn test_raw_schema_from_yaml() {
    let yaml = r#"
tables:
  - name: customers
    primary_key: id
    columns:
      - name: id
        nullable: false
      - name: name
  - name: tags
    columns:
      - name: label
        has_default: true
"#;
    let raw: RawSchema = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(raw.tables.len(), 2);
    assert!(raw.tables[0].columns[1].nullable);
    assert!(raw.tables[1].primary_key.is_none());

    let schema = SchemaGraph::build(raw).unwrap();
    assert!(schema.table("tags").unwrap().primary_key.is_none());
}

#[test]
fn test_raw_schema_rejects_unknown_fields() {
    let json = r#"{"tables": [], "views": []}"#;
    assert!(serde_json::from_str::<RawSchema>(json).is_err());
}

#[test]
fn test_keyless_table_builds() {
    let raw = RawSchema {
        tables: vec![raw_keyless_table("events", &[("kind", false)])],
        foreign_keys: vec![],
    };
    let schema = graph(raw);
    assert_eq!(schema.key_alias("events").unwrap(), "events_id");
}
