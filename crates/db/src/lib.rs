//! Durable session ledger: identity linkage and the refresh-session audit
//! trail, stored in PostgreSQL.

use sqlx::postgres::PgPoolOptions;

pub mod ledger;
pub mod memory;
pub mod models;
pub mod repositories;

pub use ledger::{LedgerError, PgLedger, SessionLedger};
pub use memory::MemoryLedger;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations under `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
