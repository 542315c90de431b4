//! Postgres persistence for the ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for accounts, entries and transfers
//! - [`PgLedgerStore`], the transactional store the transfer executor runs on
//! - Read repositories for accounts and ledger history
//! - Database migrations

pub mod entities;
mod mapping;
pub mod migration;
pub mod repositories;
pub mod store;

pub use repositories::{AccountError, AccountRepository, CreateAccountInput, LedgerRepository};
pub use store::{PgLedgerStore, PgUnitOfWork};

use std::time::Duration;

use ledgerflow_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database"
    );
    Database::connect(options).await
}
