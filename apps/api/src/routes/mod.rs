pub mod health;
pub mod preview;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Live preview
        .route(
            "/api/v1/preview/:resume_id",
            put(preview::handle_submit)
                .get(preview::handle_get_preview)
                .delete(preview::handle_close),
        )
        .route(
            "/api/v1/preview/:resume_id/viewport",
            post(preview::handle_viewport),
        )
        .route(
            "/api/v1/preview/:resume_id/usable-height",
            put(preview::handle_usable_height),
        )
        // Export
        .route(
            "/api/v1/preview/:resume_id/export",
            get(preview::handle_export),
        )
        .with_state(state)
}
