//! Health and index endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    if let Some(pool) = &state.db {
        if let Err(e) = db::health_check(pool).await {
            tracing::warn!("Health check failed: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "timestamp": timestamp,
                    "message": "Database unavailable",
                })),
            );
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": timestamp,
            "message": "Deliverance Church API is running",
        })),
    )
}

/// `GET /api`
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Deliverance Church Website API",
        "version": state.settings.version,
        "endpoints": {
            "health": "/api/health",
            "auth": "/api/auth/*",
            "users": "/api/users/*",
        },
    }))
}
