use super::*;
use fm_core::record;

fn table(name: &str) -> TableName {
    TableName::try_new(name).unwrap()
}

fn seeded() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE users (id INTEGER, name VARCHAR, active BOOLEAN);
         INSERT INTO users VALUES (1, 'Alice', true), (2, 'Bob', false), (3, 'O''Hara', true);",
    )
    .unwrap();
    db
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[tokio::test]
async fn test_count() {
    let db = seeded();
    let count = db
        .query(&QuerySpec::count(&table("users")))
        .await
        .unwrap()
        .into_count()
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_select_pages_in_stable_order() {
    let db = seeded();
    let first = db
        .query(&QuerySpec::select(&table("users"), 0, 2))
        .await
        .unwrap()
        .into_rows()
        .unwrap();
    let second = db
        .query(&QuerySpec::select(&table("users"), 2, 2))
        .await
        .unwrap()
        .into_rows()
        .unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0]["id"], Value::Int(1));
    assert_eq!(first[0]["name"], Value::text("Alice"));
    assert_eq!(first[1]["active"], Value::Bool(false));
    assert_eq!(second[0]["name"], Value::text("O'Hara"));
}

#[tokio::test]
async fn test_insert_escapes_and_fills_missing_columns() {
    let db = seeded();
    let rows = vec![
        record([("id", Value::Int(4)), ("name", Value::text("D'Arcy"))]),
        record([("id", Value::Int(5)), ("active", Value::Bool(true))]),
    ];
    let affected = db
        .query(&QuerySpec::insert(&table("users"), rows))
        .await
        .unwrap()
        .into_ack()
        .unwrap();
    assert_eq!(affected, 2);

    let all = db
        .query(&QuerySpec::select(&table("users"), 3, 10))
        .await
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(all[0]["name"], Value::text("D'Arcy"));
    assert_eq!(all[0]["active"], Value::Null);
    assert_eq!(all[1]["name"], Value::Null);
}

#[tokio::test]
async fn test_insert_nothing_is_a_noop() {
    let db = seeded();
    let ack = db
        .query(&QuerySpec::insert(&table("users"), Vec::new()))
        .await
        .unwrap();
    assert_eq!(ack, QueryOutput::Ack { rows_affected: 0 });
}

#[tokio::test]
async fn test_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db
        .query(&QuerySpec::count(&table("ghost")))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));
}

#[tokio::test]
async fn test_schema_qualified_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA raw; CREATE TABLE raw.events (id INTEGER); INSERT INTO raw.events VALUES (1), (2);")
        .unwrap();
    let count = db
        .query(&QuerySpec::count(&table("raw.events")))
        .await
        .unwrap()
        .into_count()
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_quote_table_rejects_empty_parts() {
    assert!(quote_table(&table("raw.")).is_err());
    assert_eq!(quote_table(&table("raw.users")).unwrap(), "\"raw\".\"users\"");
    assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn test_literals() {
    assert_eq!(literal(&Value::Null), "NULL");
    assert_eq!(literal(&Value::Int(-3)), "-3");
    assert_eq!(literal(&Value::Float(2.5)), "2.5");
    assert_eq!(literal(&Value::Float(f64::NAN)), "NULL");
    assert_eq!(literal(&Value::text("it's")), "'it''s'");
}

#[tokio::test]
async fn test_file_backed_database_persists() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("warehouse.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
    }
    let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    let count = db
        .query(&QuerySpec::count(&table("t")))
        .await
        .unwrap()
        .into_count()
        .unwrap();
    assert_eq!(count, 1);
}
