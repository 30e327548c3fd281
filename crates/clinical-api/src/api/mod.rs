//! Router assembly
//!
//! Mounts feature routes under `/api`, the health check at `/health` and an
//! envelope-shaped 404 for everything else, then applies the middleware
//! stack.

pub mod response;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::error::AppError;
use crate::features::{self, FeatureState};
use crate::{db, middleware};

/// State for top-level handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub features: FeatureState,
}

impl AppState {
    pub fn new(db: PgPool, features: FeatureState) -> Self {
        Self { db, features }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    pub database: &'static str,
    pub etl_service: &'static str,
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_routes = features::router(state.features.clone());

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/api", feature_routes)
        .fallback(route_not_found)
        // Apply layers from innermost to outermost
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
///
/// 503 when the database is unreachable. The ETL service is reported but
/// does not affect the status code.
async fn health_check(State(state): State<AppState>) -> Response {
    let (database, etl_reachable) = tokio::join!(
        db::health_check(&state.db),
        state.features.jobs.etl_service_reachable()
    );
    let database_ok = match database {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = ?e, "Database health check failed");
            false
        },
    };

    let body = HealthStatus {
        status: if database_ok { "healthy" } else { "unhealthy" },
        timestamp: response::now_iso8601(),
        database: if database_ok { "connected" } else { "disconnected" },
        etl_service: if etl_reachable { "connected" } else { "unreachable" },
    };
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body)).into_response()
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Serve `app` on `addr` until `shutdown` resolves
pub async fn serve<F>(app: Router, addr: std::net::SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
