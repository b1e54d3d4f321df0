use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::config::Config;
use crate::db::SharedPriceStore;
use crate::features;
use crate::middleware;

/// Application state shared across top-level handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedPriceStore,
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        store: state.store.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/api/v0", features::router(feature_state))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    match state.store.ping().await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
