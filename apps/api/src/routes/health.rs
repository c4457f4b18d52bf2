use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /health, GET /api/health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "recruit-api"
    }))
}

/// GET /
/// Always 200; the body says whether the document store answered a ping.
pub async fn home_handler(State(state): State<AppState>) -> Json<Value> {
    let (database, status) = match state.store.ping().await {
        Ok(()) => ("connected", "healthy"),
        Err(e) => {
            warn!("Database ping failed: {e}");
            ("disconnected", "unhealthy")
        }
    };
    Json(json!({
        "message": "Recruiting API",
        "database": database,
        "status": status
    }))
}
