//! Connection pool over the sqlx `Any` driver.
//!
//! One URL decides everything: the scheme picks the backend, the rest is
//! handed to sqlx. SQLite files, in-memory SQLite, PostgreSQL and MySQL all
//! go through the same pool type, which keeps the store and the migration
//! runner backend-agnostic.

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::persistence::error::PersistenceError;

/// Database family behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
    Mysql,
}

impl DatabaseBackend {
    /// Classify a connection URL by its scheme.
    pub fn from_url(url: &str) -> Result<Self, PersistenceError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            other => Err(PersistenceError::Connection(format!(
                "unsupported database scheme '{other}' (expected sqlite, postgres or mysql)"
            ))),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgresql",
            Self::Mysql => "mysql",
        }
    }
}

/// Shared handle on the insurance database, cheap to clone.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: AnyPool,
    backend: DatabaseBackend,
}

impl ConnectionPool {
    /// Connect and size the pool.
    ///
    /// An in-memory SQLite database exists per connection, so `:memory:`
    /// URLs are clamped to a single connection; a second connection would
    /// see an unrelated empty database.
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, PersistenceError> {
        sqlx::any::install_default_drivers();
        let backend = DatabaseBackend::from_url(url)?;

        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections
        };
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;
        tracing::info!(
            backend = backend.label(),
            max_connections,
            "database pool ready"
        );

        Ok(Self { pool, backend })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_detection() {
        assert_eq!(
            DatabaseBackend::from_url("sqlite::memory:").unwrap(),
            DatabaseBackend::Sqlite
        );
        assert_eq!(
            DatabaseBackend::from_url("sqlite://aegis.db").unwrap(),
            DatabaseBackend::Sqlite
        );
        assert_eq!(
            DatabaseBackend::from_url("postgresql://localhost/assurance").unwrap(),
            DatabaseBackend::Postgres
        );
        assert_eq!(
            DatabaseBackend::from_url("mysql://localhost/assurance").unwrap(),
            DatabaseBackend::Mysql
        );
        let err = DatabaseBackend::from_url("redis://localhost").unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[tokio::test]
    async fn test_memory_pool_answers_queries() {
        // Requested with 5 connections; the :memory: clamp makes it 1.
        let pool = ConnectionPool::new("sqlite::memory:", 5, 5).await.unwrap();
        assert_eq!(pool.backend(), DatabaseBackend::Sqlite);
        sqlx::query("SELECT 1").execute(pool.pool()).await.unwrap();
    }
}
