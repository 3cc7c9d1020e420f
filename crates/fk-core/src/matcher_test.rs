use super::*;
use crate::test_utils::{columns, graph, purchases_schema, raw_table, shop_schema};
use crate::schema::RawSchema;

fn touched(names: &[&str]) -> BTreeSet<TableName> {
    names.iter().map(|n| TableName::new(*n)).collect()
}

#[test]
fn test_parse_overrides() {
    let raw = BTreeMap::from([("customers.name".to_string(), "customer_name".to_string())]);
    let overrides = ColumnOverrides::parse(&raw).unwrap();
    assert_eq!(
        overrides.get(&TableName::new("customers"), &ColumnName::new("name")),
        Some("customer_name")
    );
    assert!(overrides.claimed().contains("customer_name"));
}

#[test]
fn test_parse_override_without_table() {
    let raw = BTreeMap::from([("name".to_string(), "customer_name".to_string())]);
    assert!(matches!(
        ColumnOverrides::parse(&raw),
        Err(CoreError::InvalidOverride { .. })
    ));
}

#[test]
fn test_parse_override_with_extra_dot() {
    let raw = BTreeMap::from([("main.customers.name".to_string(), "n".to_string())]);
    assert!(matches!(
        ColumnOverrides::parse(&raw),
        Err(CoreError::InvalidOverride { .. })
    ));
}

#[test]
fn test_resolve_single_table() {
    let schema = graph(purchases_schema());
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let mapping = matcher
        .resolve_table(&columns(&["name", "amount"]), "purchases")
        .unwrap();
    assert_eq!(mapping.db_columns(), vec!["amount", "name"]);
    assert_eq!(mapping.dataset_columns(), vec!["amount", "name"]);
}

#[test]
fn test_missing_required_column() {
    let schema = graph(purchases_schema());
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let err = matcher
        .resolve_table(&columns(&["name"]), "purchases")
        .unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::MissingColumn);
    assert!(matches!(
        err,
        CoreError::MissingRequiredColumn { ref column, .. } if column == "amount"
    ));
}

#[test]
fn test_nullable_column_may_be_absent() {
    let raw = RawSchema {
        tables: vec![raw_table("people", &[("name", false), ("nickname", true)])],
        foreign_keys: vec![],
    };
    let schema = graph(raw);
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let mapping = matcher.resolve_table(&columns(&["name"]), "people").unwrap();
    assert_eq!(mapping.db_columns(), vec!["name"]);
}

#[test]
fn test_foreign_key_comes_from_touched_parent() {
    let schema = graph(shop_schema());
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let mappings = matcher
        .resolve(&columns(&["name", "total"]), &touched(&["customers", "orders"]))
        .unwrap();
    let orders = &mappings[1];
    assert_eq!(orders.table, "orders");
    let fk = orders.get("customer_id").unwrap();
    assert_eq!(fk.dataset_column, "customer_id");
    assert!(fk.is_key);
    assert_eq!(
        fk.source,
        MappingSource::Key {
            parent: TableName::new("customers")
        }
    );
    assert_eq!(orders.data_dataset_columns(), vec!["total"]);
}

#[test]
fn test_foreign_key_required_without_parent() {
    let schema = graph(shop_schema());
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    assert!(matches!(
        matcher.resolve_table(&columns(&["total"]), "orders"),
        Err(CoreError::MissingRequiredColumn { .. })
    ));

    // supplying the key directly is fine
    let mapping = matcher
        .resolve_table(&columns(&["customer_id", "total"]), "orders")
        .unwrap();
    assert_eq!(
        mapping.get("customer_id").unwrap().source,
        MappingSource::Dataset
    );
}

#[test]
fn test_ambiguous_column() {
    let raw = RawSchema {
        tables: vec![
            raw_table("customers", &[("name", false)]),
            raw_table("products", &[("name", false)]),
        ],
        foreign_keys: vec![],
    };
    let schema = graph(raw);
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let err = matcher
        .resolve(&columns(&["name"]), &touched(&["customers", "products"]))
        .unwrap_err();
    assert!(matches!(err, CoreError::AmbiguousColumn { .. }));
    assert!(err.to_string().contains("'customers', 'products'"));
}

#[test]
fn test_override_resolves_ambiguity() {
    let raw = RawSchema {
        tables: vec![
            raw_table("customers", &[("name", false)]),
            raw_table("products", &[("name", false)]),
        ],
        foreign_keys: vec![],
    };
    let schema = graph(raw);
    let mut overrides = ColumnOverrides::new();
    overrides.insert("customers", "name", "customer_name").unwrap();
    overrides.insert("products", "name", "product_name").unwrap();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let mappings = matcher
        .resolve(
            &columns(&["customer_name", "product_name"]),
            &touched(&["customers", "products"]),
        )
        .unwrap();
    assert_eq!(mappings[0].dataset_columns(), vec!["customer_name"]);
    assert_eq!(mappings[1].dataset_columns(), vec!["product_name"]);
}

#[test]
fn test_override_dataset_column_missing() {
    let schema = graph(purchases_schema());
    let mut overrides = ColumnOverrides::new();
    overrides.insert("purchases", "name", "buyer").unwrap();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    assert!(matches!(
        matcher.resolve_table(&columns(&["name", "amount"]), "purchases"),
        Err(CoreError::OverrideColumnNotInDataset { .. })
    ));
}

#[test]
fn test_override_on_primary_key() {
    let schema = graph(purchases_schema());
    let mut overrides = ColumnOverrides::new();
    overrides.insert("purchases", "id", "name").unwrap();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    let err = matcher
        .resolve_table(&columns(&["name", "amount"]), "purchases")
        .unwrap_err();
    assert!(err.to_string().contains("primary keys cannot be set"));
}

#[test]
fn test_claimed_column_does_not_match_by_name() {
    let raw = RawSchema {
        tables: vec![raw_table("people", &[("name", false), ("alias", true)])],
        foreign_keys: vec![],
    };
    let schema = graph(raw);
    let mut overrides = ColumnOverrides::new();
    overrides.insert("people", "alias", "name").unwrap();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    // "name" feeds people.alias, so people.name has no source
    assert!(matches!(
        matcher.resolve_table(&columns(&["name"]), "people"),
        Err(CoreError::MissingRequiredColumn { .. })
    ));
}

#[test]
fn test_no_matching_columns() {
    let raw = RawSchema {
        tables: vec![raw_table("notes", &[("body", true)])],
        foreign_keys: vec![],
    };
    let schema = graph(raw);
    let overrides = ColumnOverrides::new();
    let matcher = ColumnMatcher::new(&schema, &overrides);

    assert!(matches!(
        matcher.resolve_table(&columns(&["title"]), "notes"),
        Err(CoreError::NoMatchingColumns { .. })
    ));
}
