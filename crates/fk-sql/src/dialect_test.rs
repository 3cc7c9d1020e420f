use super::*;

#[test]
fn test_duckdb_parse() {
    let dialect = DuckDbDialect::new();
    let stmts = dialect.parse("SELECT * FROM customers").unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_placeholder_styles() {
    assert_eq!(PlaceholderStyle::QuestionMark.render("name", 1), "?");
    assert_eq!(PlaceholderStyle::Numbered.render("name", 3), "$3");
    assert_eq!(PlaceholderStyle::Colon.render("name", 1), ":name");
    assert_eq!(PlaceholderStyle::Pyformat.render("name", 1), "%(name)s");
}

#[test]
fn test_conflict_strategy_per_dialect() {
    let duckdb = DuckDbDialect::new();
    let postgres = PostgresDialect::new();
    assert_eq!(duckdb.conflict_strategy(OnConflict::Error), ConflictStrategy::Error);
    assert_eq!(duckdb.conflict_strategy(OnConflict::Ignore), ConflictStrategy::OrIgnore);
    assert_eq!(
        postgres.conflict_strategy(OnConflict::Ignore),
        ConflictStrategy::DoNothing
    );
}

#[test]
fn test_dialect_from_name() {
    assert_eq!(dialect_from_name("DuckDB").unwrap().name(), "duckdb");
    assert_eq!(dialect_from_name("postgresql").unwrap().name(), "postgres");
    assert_eq!(dialect_from_name("sqlite").unwrap().name(), "sqlite");
    assert!(matches!(
        dialect_from_name("oracle"),
        Err(SqlError::UnknownDialect(_))
    ));
}

#[test]
fn test_ident_quotes_only_when_needed() {
    let dialect = DuckDbDialect::new();
    assert_eq!(dialect.ident("orders"), "orders");
    assert_eq!(dialect.ident("order date"), "\"order date\"");
}

#[test]
fn test_parse_error_location() {
    let dialect = DuckDbDialect::new();
    let result = dialect.parse("SELECT name\nFROM customers WHERE )");
    assert!(result.is_err());
    if let Err(SqlError::ParseError { line, message, .. }) = result {
        assert_eq!(line, 2, "message: {message}");
    }
}

#[test]
fn test_parse_location_extraction() {
    assert_eq!(
        parse_location_from_error("Expected: an expression, found: FROM at Line: 2, Column: 1"),
        (2, 1)
    );
    assert_eq!(parse_location_from_error("no location"), (0, 0));
}

#[test]
fn test_ident_quotes_reserved_words() {
    let dialect = DuckDbDialect::new();
    assert_eq!(dialect.ident("order"), r#""order""#);
    assert_eq!(dialect.ident("Group"), r#""Group""#);
    assert_eq!(dialect.ident("user"), r#""user""#);
    assert_eq!(dialect.ident("order total"), r#""order total""#);
    assert_eq!(dialect.ident("orders"), "orders");
    assert_eq!(dialect.ident("name"), "name");
    assert_eq!(dialect.ident("order_id"), "order_id");
}

#[test]
fn test_reserved_words_parse_once_quoted() {
    let dialect = PostgresDialect::new();
    for word in ["order", "group", "select"] {
        let sql = format!("SELECT {0} FROM {0} WHERE {0} IS NOT NULL", dialect.ident(word));
        assert!(dialect.parse(&sql).is_ok(), "{sql}");
    }
}
