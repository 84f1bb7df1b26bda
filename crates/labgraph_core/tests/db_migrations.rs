use labgraph_core::db::migrations::latest_version;
use labgraph_core::db::{open_db, open_db_in_memory, DbError, Schema};
use labgraph_core::repo::document_store::SqliteDocumentStore;
use labgraph_core::StoreError;
use rusqlite::Connection;

#[test]
fn document_schema_applies_all_migrations() {
    let conn = open_db_in_memory(Schema::Documents).unwrap();

    assert_eq!(schema_version(&conn), latest_version(Schema::Documents));
    assert_table_exists(&conn, "documents");
    assert_table_missing(&conn, "vertices");
}

#[test]
fn graph_schema_applies_all_migrations() {
    let conn = open_db_in_memory(Schema::Graph).unwrap();

    assert_eq!(schema_version(&conn), latest_version(Schema::Graph));
    assert_table_exists(&conn, "vertices");
    assert_table_exists(&conn, "edges");
    assert_table_missing(&conn, "documents");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("documents.sqlite3");

    let conn_first = open_db(&path, Schema::Documents).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version(Schema::Documents));
    drop(conn_first);

    let conn_second = open_db(&path, Schema::Documents).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version(Schema::Documents));
    assert_table_exists(&conn_second, "documents");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, Schema::Graph).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            schema,
            db_version,
            latest_supported,
        } => {
            assert_eq!(schema, Schema::Graph);
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version(Schema::Graph));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteDocumentStore::try_new(conn).err().unwrap();
    assert!(matches!(
        err,
        StoreError::UninitializedConnection {
            schema: Schema::Documents,
            actual_version: 0,
            ..
        }
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn table_exists(conn: &Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(table_exists(conn, table_name), "table {table_name} does not exist");
}

fn assert_table_missing(conn: &Connection, table_name: &str) {
    assert!(!table_exists(conn, table_name), "table {table_name} should not exist");
}
