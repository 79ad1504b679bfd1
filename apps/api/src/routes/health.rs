use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/health
/// Returns service status, version, and whether a text model was selected at startup.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "carbonkind-api",
        "aiAvailable": state.pipeline.ai_model().is_some(),
        "aiModel": state.pipeline.ai_model(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
