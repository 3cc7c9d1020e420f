//! CLI integration tests
//!
//! Each test builds a DuckDB file in a temp directory, runs the `fkload`
//! binary against it and inspects the output and the stored rows.

use fk_core::Value;
use fk_db::{DuckDbExecutor, Executor};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SHOP_DDL: &str = "
    CREATE SEQUENCE customers_seq;
    CREATE SEQUENCE orders_seq;
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY DEFAULT nextval('customers_seq'),
        name VARCHAR NOT NULL
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY DEFAULT nextval('orders_seq'),
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        total DOUBLE NOT NULL
    );
";

/// Path to the compiled fkload binary (resolved at compile time)
fn fkload_bin() -> String {
    env!("CARGO_BIN_EXE_fkload").to_string()
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = DuckDbExecutor::from_path(&dir.path().join("shop.duckdb")).unwrap();
        db.execute_batch(SHOP_DDL).unwrap();
        Self { dir }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("shop.duckdb")
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(fkload_bin())
            .arg("--db")
            .arg(self.db())
            .args(args)
            .env_remove("FKLOAD_DB")
            .env("RUST_LOG", "warn")
            .output()
            .expect("Failed to run fkload")
    }

    fn count(&self, table: &str) -> i64 {
        let db = DuckDbExecutor::from_path(&self.db()).unwrap();
        let data = db
            .query(&format!("SELECT count(*) AS n FROM {table}"), &[])
            .unwrap();
        match &data.rows()[0][0] {
            Value::Int(n) => *n,
            other => panic!("unexpected count {other:?}"),
        }
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_load_csv() {
    let fixture = Fixture::new();
    let csv = fixture.file("orders.csv", "name,total\nann,10.5\nbob,20\nann,7.25\n");
    let out = fixture.dir.path().join("out.csv");

    let output = fixture.run(&["load", "--csv", path_arg(&csv), "--output", path_arg(&out)]);
    let text = combined(&output);
    assert!(output.status.success(), "load should succeed:\n{text}");
    assert!(text.contains("customers: 2 rows written"), "{text}");
    assert!(text.contains("orders: 3 rows written"), "{text}");
    assert!(text.contains("Validation passed"), "{text}");

    assert_eq!(fixture.count("customers"), 2);
    assert_eq!(fixture.count("orders"), 3);

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("customer_id,orders_id\n"), "{written}");
    assert_eq!(written.lines().count(), 4);
}

#[test]
fn test_load_missing_column_fails_without_writing() {
    let fixture = Fixture::new();
    let csv = fixture.file("orders.csv", "total\n10.5\n");

    let output = fixture.run(&["load", "--csv", path_arg(&csv), "-t", "orders"]);
    let text = combined(&output);
    assert!(!output.status.success());
    assert!(text.contains("no changes were committed"), "{text}");
    assert!(text.contains("[MC00"), "{text}");
    assert_eq!(fixture.count("customers"), 0);
    assert_eq!(fixture.count("orders"), 0);
}

#[test]
fn test_load_with_config_and_override() {
    let fixture = Fixture::new();
    let csv = fixture.file("orders.csv", "customer,total\nann,1.5\n");
    let config = fixture.file("load.yml", "overrides:\n  customers.name: customer\nexact: false\n");

    let output = fixture.run(&[
        "load",
        "--csv",
        path_arg(&csv),
        "--config",
        path_arg(&config),
    ]);
    assert!(output.status.success(), "{}", combined(&output));
    assert!(combined(&output).contains("subset comparison"));
    assert_eq!(fixture.count("customers"), 1);
}

#[test]
fn test_plan_prints_statements_without_writing() {
    let fixture = Fixture::new();
    let csv = fixture.file("orders.csv", "name,total\nann,10.5\n");

    let output = fixture.run(&["plan", "--csv", path_arg(&csv)]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", combined(&output));
    assert!(stdout.contains("1. customers (name) -> customer_id"), "{stdout}");
    assert!(stdout.contains("INSERT INTO orders (customer_id, total) VALUES (?, ?);"), "{stdout}");
    assert!(stdout.contains("FROM customers JOIN orders ON orders.customer_id = customers.id"), "{stdout}");
    assert_eq!(fixture.count("customers"), 0);
}

#[test]
fn test_schema_text_and_yaml() {
    let fixture = Fixture::new();

    let output = fixture.run(&["schema"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", combined(&output));
    assert!(stdout.contains("Table orders ("), "{stdout}");
    assert!(stdout.contains("customer_id NOT NULL REFERENCES customers (id)"), "{stdout}");

    let output = fixture.run(&["schema", "--format", "yaml"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", combined(&output));
    let raw: fk_core::RawSchema = serde_yaml::from_str(&stdout).unwrap();
    assert_eq!(raw.tables.len(), 2);
    assert_eq!(raw.foreign_keys.len(), 1);
}

#[test]
fn test_missing_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(fkload_bin())
        .args(["schema", "--db"])
        .arg(dir.path().join("nowhere.duckdb"))
        .env_remove("FKLOAD_DB")
        .output()
        .expect("Failed to run fkload");
    assert!(!output.status.success());
    assert!(combined(&output).contains("Database file not found"));
    assert!(!dir.path().join("nowhere.duckdb").exists());
}
