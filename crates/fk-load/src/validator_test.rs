use super::*;
use fk_db::DuckDbExecutor;

fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
    Dataset::new(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn purchases_db() -> DuckDbExecutor {
    let db = DuckDbExecutor::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE purchases (id INTEGER PRIMARY KEY, name VARCHAR, amount INTEGER);
         INSERT INTO purchases VALUES (1, 'pen', 3), (2, 'ink', 5);",
    )
    .unwrap();
    db
}

#[test]
fn test_exact_match_ignores_row_order() {
    let original = dataset(
        &["name", "amount"],
        vec![vec![text("a"), Value::Int(1)], vec![text("b"), Value::Int(2)]],
    );
    let retrieved = dataset(
        &["name", "amount"],
        vec![vec![text("b"), Value::Int(2)], vec![text("a"), Value::Int(1)]],
    );

    let report = compare_datasets(&original, &retrieved, CompareMode::Exact).unwrap();
    assert!(report.is_match());
    assert_eq!(report.expected_rows, 2);
    assert_eq!(report.retrieved_rows, 2);
}

#[test]
fn test_extra_rows_fail_exact_but_pass_subset() {
    let original = dataset(&["name", "amount"], vec![vec![text("a"), Value::Int(1)]]);
    let retrieved = dataset(
        &["name", "amount"],
        vec![vec![text("a"), Value::Int(1)], vec![text("b"), Value::Int(2)]],
    );

    let exact = compare_datasets(&original, &retrieved, CompareMode::Exact).unwrap();
    assert!(!exact.is_match());
    assert!(exact.missing.is_empty());
    assert_eq!(exact.unexpected, vec![(vec![text("b"), Value::Int(2)], 1)]);
    assert_eq!(
        exact.to_string(),
        "exact comparison over [name, amount]: expected 1 rows, retrieved 2; 1 unexpected ('b', 2)"
    );

    let subset = compare_datasets(&original, &retrieved, CompareMode::Subset).unwrap();
    assert!(subset.is_match());
}

#[test]
fn test_missing_rows_fail_both_modes() {
    let original = dataset(
        &["name"],
        vec![vec![text("a")], vec![text("b")], vec![text("c")]],
    );
    let retrieved = dataset(&["name"], vec![vec![text("a")]]);

    for mode in [CompareMode::Exact, CompareMode::Subset] {
        let report = compare_datasets(&original, &retrieved, mode).unwrap();
        assert!(!report.is_match());
        assert_eq!(
            report.missing,
            vec![(vec![text("b")], 1), (vec![text("c")], 1)]
        );
    }
}

#[test]
fn test_duplicate_rows_are_counted() {
    let twice = dataset(&["name"], vec![vec![text("a")], vec![text("a")]]);
    let once = dataset(&["name"], vec![vec![text("a")]]);

    let subset = compare_datasets(&twice, &once, CompareMode::Subset).unwrap();
    assert!(!subset.is_match());
    assert_eq!(subset.missing, vec![(vec![text("a")], 1)]);

    let exact = compare_datasets(&twice, &twice, CompareMode::Exact).unwrap();
    assert!(exact.is_match());
    assert_eq!(exact.expected_rows, 2);

    let exact = compare_datasets(&once, &twice, CompareMode::Exact).unwrap();
    assert!(!exact.is_match());
    assert_eq!(exact.unexpected, vec![(vec![text("a")], 1)]);
}

#[test]
fn test_check_loaded_expects_each_distinct_row_once() {
    let db = purchases_db();
    let statement = CompareStatement::Custom(
        "SELECT name, amount FROM purchases WHERE name = 'pen'".to_string(),
    );
    let original = dataset(
        &["name", "amount"],
        vec![vec![text("pen"), Value::Int(3)], vec![text("pen"), Value::Int(3)]],
    );

    let err = Validator::new(&db)
        .check(&statement, &original, CompareMode::Exact)
        .unwrap_err();
    assert!(matches!(err, LoadError::Validation(_)));

    let report = Validator::new(&db)
        .check_loaded(&statement, &original, CompareMode::Exact)
        .unwrap();
    assert_eq!(report.expected_rows, 1);
}

#[test]
fn test_check_loaded_still_counts_extra_copies() {
    let db = purchases_db();
    db.execute_batch("INSERT INTO purchases VALUES (3, 'pen', 3);").unwrap();
    let statement = CompareStatement::Custom("SELECT name, amount FROM purchases".to_string());
    let original = dataset(
        &["name", "amount"],
        vec![vec![text("pen"), Value::Int(3)], vec![text("ink"), Value::Int(5)]],
    );

    let err = Validator::new(&db)
        .check_loaded(&statement, &original, CompareMode::Exact)
        .unwrap_err();
    let LoadError::Validation(report) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(report.unexpected, vec![(vec![text("pen"), Value::Int(3)], 1)]);
}

#[test]
fn test_retrieved_values_take_original_kinds() {
    let original = dataset(&["code", "price"], vec![vec![Value::Int(7), Value::Float(2.5)]]);
    let retrieved = dataset(&["price", "code", "id"], vec![vec![text("2.5"), text("7"), Value::Int(1)]]);

    let report = compare_datasets(&original, &retrieved, CompareMode::Exact).unwrap();
    assert!(report.is_match(), "{report}");
    assert_eq!(report.columns, vec!["code", "price"]);
}

#[test]
fn test_retrieved_missing_a_column_is_an_error() {
    let original = dataset(&["name", "amount"], vec![vec![text("a"), Value::Int(1)]]);
    let retrieved = dataset(&["name"], vec![vec![text("a")]]);
    assert!(compare_datasets(&original, &retrieved, CompareMode::Exact).is_err());
}

#[test]
fn test_check_synthesized_statement_reshapes_original() {
    let db = purchases_db();
    let statement = CompareStatement::Synthesized(CompareQuery {
        sql: "SELECT name AS buyer, amount AS amount FROM purchases".to_string(),
        columns: vec!["buyer".to_string(), "amount".to_string()],
        sources: vec!["name".to_string(), "amount".to_string()],
    });
    let original = dataset(
        &["amount", "name"],
        vec![vec![Value::Int(5), text("ink")], vec![Value::Int(3), text("pen")]],
    );

    let report = Validator::new(&db)
        .check(&statement, &original, CompareMode::Exact)
        .unwrap();
    assert_eq!(report.columns, vec!["buyer", "amount"]);
    assert_eq!(report.retrieved_rows, 2);
}

#[test]
fn test_check_custom_statement_uses_its_columns() {
    let db = purchases_db();
    let statement =
        CompareStatement::Custom("SELECT name FROM purchases WHERE amount > 4".to_string());
    let original = dataset(&["name", "amount"], vec![vec![text("ink"), Value::Int(5)]]);

    let report = Validator::new(&db)
        .check(&statement, &original, CompareMode::Exact)
        .unwrap();
    assert_eq!(report.columns, vec!["name"]);
}

#[test]
fn test_check_mismatch_is_validation_error() {
    let db = purchases_db();
    let statement = CompareStatement::Custom("SELECT name, amount FROM purchases".to_string());
    let original = dataset(&["name", "amount"], vec![vec![text("pen"), Value::Int(3)]]);

    let err = Validator::new(&db)
        .check(&statement, &original, CompareMode::Exact)
        .unwrap_err();
    assert_eq!(err.kind(), fk_core::ErrorKind::Validation);
    assert!(err.to_string().starts_with("[L003]"), "{err}");

    let report = Validator::new(&db)
        .check(&statement, &original, CompareMode::Subset)
        .unwrap();
    assert!(report.is_match());
}

#[test]
fn test_check_empty_result_for_nonempty_original_fails() {
    let db = purchases_db();
    let statement =
        CompareStatement::Custom("SELECT name FROM purchases WHERE amount > 100".to_string());
    let original = dataset(&["name"], vec![vec![text("pen")]]);

    let err = Validator::new(&db)
        .check(&statement, &original, CompareMode::Subset)
        .unwrap_err();
    assert!(matches!(err, LoadError::Validation(_)));
}
