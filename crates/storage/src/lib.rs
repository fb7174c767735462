//! SeaORM-backed storage adapters that satisfy the domain storage traits
//! while keeping the database backend swappable (SQLite by default,
//! PostgreSQL via feature flag).

mod entity;
mod errors;
mod migration;
mod payment_store;
mod plan_store;
mod subscription_store;
mod user_store;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use errors::StorageError;
use migration::run_migrations;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use subgate_domain::storage::StorageResult;

/// Shared storage handle used by the HTTP API and sweeper services.
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStorage {
    /// Connects to the provided database URL and ensures the schema is
    /// present.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let db = Database::connect(database_url)
            .await
            .map_err(StorageError::from_source)?;
        run_migrations(&db).await?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Like [`connect`](Self::connect) but with caller-supplied pool
    /// options. In-memory SQLite needs a single-connection pool, otherwise
    /// every pooled connection sees its own empty database.
    pub async fn connect_with(options: ConnectOptions) -> StorageResult<Self> {
        let db = Database::connect(options)
            .await
            .map_err(StorageError::from_source)?;
        run_migrations(&db).await?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }
}
