pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::history::handlers as history;
use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/me", get(handlers::handle_me))
        // Interview selection
        .route(
            "/api/v1/interview-types",
            get(handlers::handle_list_interview_types),
        )
        .route(
            "/api/v1/interviews/:type/sessions",
            post(handlers::handle_create_session),
        )
        // Live sessions
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/answer",
            put(handlers::handle_edit_answer),
        )
        .route(
            "/api/v1/sessions/:id/transcription/start",
            post(handlers::handle_start_transcription),
        )
        .route(
            "/api/v1/sessions/:id/transcription/stop",
            post(handlers::handle_stop_transcription),
        )
        .route(
            "/api/v1/sessions/:id/transcription/fragments",
            post(handlers::handle_push_fragment),
        )
        .route("/api/v1/sessions/:id/submit", post(handlers::handle_submit))
        .route(
            "/api/v1/sessions/:id/next",
            post(handlers::handle_next_question),
        )
        .route("/api/v1/sessions/:id/save", post(handlers::handle_retry_save))
        // Standalone tools
        .route("/api/v1/analysis", post(handlers::handle_analyze_response))
        .route(
            "/api/v1/resume/extract",
            post(handlers::handle_extract_resume),
        )
        // Dashboard
        .route("/api/v1/history", get(history::handle_get_history))
        .with_state(state)
}
