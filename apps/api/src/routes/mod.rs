pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::ranking::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/session", get(handlers::handle_get_session))
        // File collection
        .route(
            "/api/v1/files",
            get(handlers::handle_list_files)
                .post(handlers::handle_upload_files)
                .delete(handlers::handle_clear_files)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/files/:index", delete(handlers::handle_remove_file))
        // Inputs
        .route(
            "/api/v1/job-description",
            put(handlers::handle_set_job_description),
        )
        .route("/api/v1/webhook", put(handlers::handle_set_webhook))
        .route("/api/v1/keywords", get(handlers::handle_vocabulary))
        .route(
            "/api/v1/keywords/extract",
            post(handlers::handle_extract_keywords),
        )
        // Analysis + report
        .route(
            "/api/v1/analysis",
            get(handlers::handle_get_analysis).post(handlers::handle_start_analysis),
        )
        .route("/api/v1/report.csv", get(handlers::handle_download_report))
        .with_state(state)
}
