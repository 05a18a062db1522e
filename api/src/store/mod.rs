//! Persistence layer for the fraud-decision gateway.
//!
//! ## Design decisions
//!
//! - **SQLite, single connection**: the history/config/account database is
//!   opened with `max_connections(1)`, so any two individual queries never
//!   run concurrently against it. That alone does not serialize a
//!   read-then-write critical section that spans more than one checkout with
//!   `.await` points in between — such as the limits gate's daily-total read
//!   followed later by the orchestrator's history write, with scoring and an
//!   advisory call in between. Those spans are serialized explicitly with a
//!   per-key lock registry (`account_lock::AccountLocks`, `case_lock::CaseLocks`)
//!   held by the route handler across the whole sequence.
//! - **Two database files**: decided transaction history lives in `DB_PATH`;
//!   in-flight advisory evaluator checkpoints live in a separate
//!   `CHECKPOINTS_DB_PATH`, so the two concerns can be backed up or wiped
//!   independently.
//! - **`INSERT OR REPLACE`**: SQLite's upsert idiom gives us "re-deciding
//!   overwrites the prior row" for free on `transaction_id`.

use std::str::FromStr;

use sqlx::{
    Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod account_catalog;
pub mod config_store;
pub mod history;

/// Open (creating if necessary) a SQLite database file, pinned to a single
/// connection so the whole pool behaves as one serialized writer.
pub async fn connect_pool(path: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn run_history_migrations(
    pool: &SqlitePool,
) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations/history").run(pool).await?;
    Ok(())
}

pub async fn run_checkpoint_migrations(
    pool: &SqlitePool,
) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations/checkpoints").run(pool).await?;
    Ok(())
}

pub type DbPool = sqlx::Pool<Sqlite>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("database migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid account type: {0}")]
    InvalidType(String),
    #[error("transaction {0} not found")]
    TransactionNotFound(String),
    #[error("advisory case {0} not found")]
    CaseNotFound(String),
}
