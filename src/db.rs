use crate::app_config;
use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::time::Duration;

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect the global pool. Calling it again keeps the first connection.
pub async fn init_db(database_url: String) -> Result<(), DbErr> {
    if DB_POOL.get().is_some() {
        return Ok(());
    }

    let db = connect(database_url).await?;
    if DB_POOL.set(db).is_err() {
        log::debug!("Database pool was initialized concurrently");
    }
    Ok(())
}

/// Open a connection pool sized from the `[database]` config section.
pub async fn connect(database_url: String) -> Result<DatabaseConnection, DbErr> {
    let config = app_config::database();

    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!(
        "Connected to {:?} database (max {} connections)",
        db.get_database_backend(),
        config.max_connections
    );
    Ok(db)
}

/// The global pool.
///
/// Panics when `init_db` has not run; only the binary and handlers call this.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL
        .get()
        .expect("get_db_pool called before init_db")
}
