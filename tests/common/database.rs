//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::sync::Once;
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

/// Route `log` output through the test harness. Run with `RUST_LOG=debug`
/// to see cascade steps.
fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Get a fresh in-memory SQLite database.
///
/// An in-memory database lives only as long as its connection, so the pool
/// is pinned to a single connection.
pub async fn get_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    Database::connect(opt).await
}

/// Get a fresh SQLite database in a temporary file, shared by `connections`
/// pooled connections so transactions really contend for locks.
///
/// The returned directory owns the file; keep it alive for the whole test.
pub async fn setup_file_test_database(
    connections: u32,
) -> Result<(TempDir, DatabaseConnection), DbErr> {
    init_logger();

    let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(e.to_string()))?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    let mut opt = ConnectOptions::new(url);
    opt.max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);
    let db = Database::connect(opt).await?;
    reviewhub::schema::create_tables(&db).await?;

    Ok((dir, db))
}

/// Setup test database with every table created
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    init_logger();

    let db = get_test_db().await?;
    reviewhub::schema::create_tables(&db).await?;

    Ok(db)
}

/// Drop a table to simulate a store that does not match the reference index.
pub async fn drop_table(db: &DatabaseConnection, table: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!("DROP TABLE {}", table),
    ))
    .await?;
    Ok(())
}

/// Count rows of a table matching a raw SQL condition.
pub async fn count_where(db: &DatabaseConnection, table: &str, condition: &str) -> Result<i64, DbErr> {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {} WHERE {}", table, condition),
        ))
        .await?
        .ok_or_else(|| DbErr::Custom("COUNT returned no row".into()))?;

    row.try_get::<i64>("", "n")
}
