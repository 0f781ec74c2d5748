pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::orchestrator::handlers;
use crate::records::handlers as records;
use crate::state::AppState;

/// Resumes are uploaded whole; allow more than axum's 2 MB default.
const RESUME_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Automation API
        .route(
            "/api/v1/automation/status",
            get(handlers::handle_backend_status),
        )
        .route(
            "/api/v1/automation/sessions",
            post(handlers::handle_open_session),
        )
        .route(
            "/api/v1/automation/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/automation/sessions/:id/resume",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(RESUME_UPLOAD_LIMIT)),
        )
        .route(
            "/api/v1/automation/sessions/:id/search",
            post(handlers::handle_search),
        )
        .route(
            "/api/v1/automation/sessions/:id/selection",
            post(handlers::handle_toggle_selection)
                .put(handlers::handle_select_all)
                .delete(handlers::handle_clear_selection),
        )
        .route(
            "/api/v1/automation/sessions/:id/apply",
            post(handlers::handle_start_apply),
        )
        .route(
            "/api/v1/automation/sessions/:id/cancel",
            post(handlers::handle_cancel),
        )
        // Application records
        .route(
            "/api/v1/applications",
            get(records::handle_list_applications).post(records::handle_create_application),
        )
        .route(
            "/api/v1/applications/stats",
            get(records::handle_application_stats),
        )
        .route(
            "/api/v1/applications/:id",
            patch(records::handle_update_application)
                .delete(records::handle_delete_application),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
