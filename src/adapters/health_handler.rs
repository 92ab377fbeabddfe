use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::persistence::InsuranceStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: String,
}

pub struct HealthHandler {
    store: Arc<InsuranceStore>,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(store: Arc<InsuranceStore>) -> Self {
        Self {
            store,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - always 200, with a component breakdown
    pub async fn health(&self) -> impl IntoResponse {
        let database = match self.store.count_produits().await {
            Ok(_) => "ok".to_string(),
            Err(e) => {
                tracing::warn!("Health check database probe failed: {}", e);
                "unreachable".to_string()
            }
        };
        let status = if database == "ok" {
            "healthy"
        } else {
            "degraded"
        };

        let uptime = self.start_time.elapsed().as_secs();
        (
            StatusCode::OK,
            Json(HealthStatus {
                status: status.to_string(),
                service: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: uptime,
                checks: HealthChecks { database },
            }),
        )
    }

    /// Readiness check - returns 200 only when the database answers
    pub async fn ready(&self) -> impl IntoResponse {
        match self.store.count_produits().await {
            Ok(_) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "message": "Server is ready to accept requests"
                })),
            ),
            Err(e) => {
                tracing::warn!("Readiness check failed: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "not_ready",
                        "message": "Database is not reachable"
                    })),
                )
            }
        }
    }

    /// Liveness check - returns 200 if the process is responsive
    pub async fn live(&self) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "alive",
                "message": "Server is alive"
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::migrations::MigrationRunner;
    use crate::persistence::ConnectionPool;

    async fn migrated_store() -> Arc<InsuranceStore> {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        MigrationRunner::new(pool.clone()).migrate_up().await.unwrap();
        Arc::new(InsuranceStore::new(pool))
    }

    /// A pool without migrations makes every probe query fail.
    async fn unmigrated_store() -> Arc<InsuranceStore> {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        Arc::new(InsuranceStore::new(pool))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let handler = HealthHandler::new(migrated_store().await);

        let response = handler.health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_with_database() {
        let handler = HealthHandler::new(migrated_store().await);

        let response = handler.ready().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_without_schema() {
        let handler = HealthHandler::new(unmigrated_store().await);

        let response = handler.ready().await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_live_endpoint() {
        let handler = HealthHandler::new(migrated_store().await);

        let response = handler.live().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
