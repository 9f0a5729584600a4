use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::database;
use crate::state::AppState;

/// GET / - service identification and route map.
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Prism API",
        "version": version,
        "description": "Multi-tenant analytics backend (auth and tenant isolation core)",
        "endpoints": {
            "health": "GET /health (public)",
            "exchange": "POST /auth/exchange (public - authorization code login)",
            "whoami": "GET /api/auth/whoami (token)",
            "refresh": "POST /api/auth/refresh (token)",
            "logout": "DELETE /api/auth/session (token)",
            "feature_flags": "/admin/feature-flags/* (tenant admin)",
            "members": "/admin/members/* (tenant admin)",
            "users": "/admin/users/* (super_admin, cross-tenant)",
        }
    }))
}

/// GET /health - liveness plus a database ping.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match database::pool::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unreachable"
                })),
            )
        }
    }
}
