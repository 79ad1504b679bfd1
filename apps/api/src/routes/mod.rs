pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::records::handlers as records;
use crate::reporting::handlers as reporting;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health::health_handler))
        // Records
        .route(
            "/ai/generate",
            post(records::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/ai/manual-entry", post(records::handle_manual_entry))
        .route("/ai/user-emissions", get(records::handle_list))
        .route(
            "/ai/record/:id",
            put(records::handle_update).delete(records::handle_delete),
        )
        // Exports
        .route("/export/export", get(reporting::handle_export))
        .route(
            "/export/sustainability-report",
            get(reporting::handle_sustainability_report),
        )
        .with_state(state)
}
