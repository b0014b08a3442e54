//! # Database Module
//!
//! The credential store, split per table:
//! - `models`: row and domain structures (User, Credential)
//! - `users`: user operations
//! - `credentials`: passkey credential operations
//!
//! Every operation is a single statement, so atomicity is per record and no
//! cross-record transaction is needed.

pub mod credentials;
pub mod models;
pub mod users;

use crate::error::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Open the SQLite pool and bring the schema up to date
///
/// Migrations are embedded from `./migrations` at compile time.
pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database ready at {}", database_url);

    Ok(pool)
}

/// In-memory database for tests
///
/// Each SQLite connection to `:memory:` sees its own database, so the pool
/// is pinned to one connection that is never recycled.
#[cfg(test)]
pub async fn connect_in_memory() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("valid sqlite url");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");

    pool
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
