//! Database persistence layer for Aegis
//!
//! Database-backed storage for the insurance domain (products, clients,
//! contracts, claims), supporting PostgreSQL, SQLite, and MySQL through
//! the sqlx Any driver.
//!
//! # Architecture
//!
//! - `InsuranceStore`: finder methods the chat tools query
//! - `MigrationRunner`: embedded schema migrations
//! - `fixtures`: demo dataset seeded on an empty database

pub mod error;
pub mod fixtures;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod store;

pub use error::PersistenceError;
pub use migrations::{MigrationResult, MigrationRunner};
pub use models::{ContratRow, PersonneMoraleRow, PersonnePhysiqueRow, ProduitRow, SinistreRow};
pub use pool::{ConnectionPool, DatabaseBackend};
pub use store::InsuranceStore;

use crate::config::DatabaseSettings;

/// Open the database, run migrations, and seed demo data when configured.
pub async fn initialize(config: &DatabaseSettings) -> Result<InsuranceStore, PersistenceError> {
    let pool = ConnectionPool::new(
        &config.url,
        config.max_connections,
        config.connect_timeout_secs,
    )
    .await?;

    let result = MigrationRunner::new(pool.clone()).migrate_up().await?;
    tracing::info!(
        "Migrations complete: {} applied, {} skipped",
        result.applied,
        result.skipped
    );

    let store = InsuranceStore::new(pool);
    if config.seed_demo_data {
        fixtures::seed_demo_data(&store).await?;
    }

    Ok(store)
}
