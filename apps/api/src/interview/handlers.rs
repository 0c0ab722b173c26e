use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::identity::AuthUser;
use crate::interview::analysis::{analyze_response, AnalysisRequest, ResponseAnalysis};
use crate::interview::catalog::{interview_types, InterviewTypeCard};
use crate::interview::feedback::FeedbackService;
use crate::interview::questions::QuestionService;
use crate::interview::session::{
    SessionController, SessionServices, SessionSettings, SessionView,
};
use crate::interview::transcription::Fragment;
use crate::models::interview::{Difficulty, InterviewParameters, InterviewType};
use crate::models::user::User;
use crate::state::AppState;

/// Where the client goes after ending a session.
const AFTER_END_REDIRECT: &str = "/dashboard";

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub session_name: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub resume_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditAnswerRequest {
    pub text: String,
    pub expected_revision: Option<u64>,
}

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub session: SessionView,
    pub redirect_to: &'static str,
}

#[derive(Serialize)]
pub struct ResumeTextResponse {
    pub resume_text: String,
}

/// GET /api/v1/me
pub async fn handle_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// GET /api/v1/interview-types
pub async fn handle_list_interview_types() -> Json<Vec<InterviewTypeCard>> {
    Json(interview_types())
}

/// POST /api/v1/interviews/:type/sessions
/// Creates a session and runs its first round.
pub async fn handle_create_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(kind): Path<String>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let interview_type: InterviewType = kind.parse().map_err(AppError::Validation)?;

    let session_name = req
        .session_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Practice - {}", Utc::now().format("%b %-d, %Y")));
    let params = InterviewParameters::new(
        interview_type,
        req.topic,
        Some(req.difficulty.unwrap_or_default()),
        req.resume_text,
    );

    let services = SessionServices {
        questions: QuestionService::new(state.llm.clone()),
        feedback: FeedbackService::new(state.llm.clone()),
        store: state.store.clone(),
    };
    let settings = SessionSettings {
        session_name,
        params,
        transcription_enabled: state.config.transcription_enabled,
    };
    let session = Arc::new(SessionController::new(user, settings, services));
    state.sessions.insert(session.clone()).await;

    let view = session.begin_round().await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.view().await))
}

/// PUT /api/v1/sessions/:id/answer
pub async fn handle_edit_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<EditAnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.edit_answer(req.text, req.expected_revision).await?))
}

/// POST /api/v1/sessions/:id/transcription/start
pub async fn handle_start_transcription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.start_transcription().await?))
}

/// POST /api/v1/sessions/:id/transcription/fragments
/// Accepted fragments are applied asynchronously; poll the session or stop to see them.
pub async fn handle_push_fragment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(fragment): Json<Fragment>,
) -> Result<StatusCode, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    session.push_fragment(fragment).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/sessions/:id/transcription/stop
pub async fn handle_stop_transcription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.stop_transcription().await?))
}

/// POST /api/v1/sessions/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.submit().await?))
}

/// POST /api/v1/sessions/:id/next
pub async fn handle_next_question(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.next_question().await?))
}

/// POST /api/v1/sessions/:id/save
pub async fn handle_retry_save(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id, &user.id).await?;
    Ok(Json(session.retry_save().await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EndSessionResponse>, AppError> {
    let session = state.sessions.remove(id, &user.id).await?;
    let view = session.end().await;
    Ok(Json(EndSessionResponse {
        session: view,
        redirect_to: AFTER_END_REDIRECT,
    }))
}

/// POST /api/v1/analysis
pub async fn handle_analyze_response(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<ResponseAnalysis>, AppError> {
    Ok(Json(analyze_response(state.llm.as_ref(), &req).await?))
}

/// POST /api/v1/resume/extract
/// Multipart upload with a `file` part holding a PDF.
pub async fn handle_extract_resume(
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ResumeTextResponse>, AppError> {
    let mut pdf: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
            pdf = Some(data);
            break;
        }
    }

    let pdf = pdf
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("Expected a non-empty 'file' part".to_string()))?;
    let size = pdf.len();

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Validation(format!("Could not read PDF: {e}")))?;

    let resume_text = text.trim().to_string();
    if resume_text.is_empty() {
        return Err(AppError::Validation(
            "The PDF contains no extractable text".to_string(),
        ));
    }
    info!(
        "Extracted {} chars of resume text from {size} byte PDF for user {}",
        resume_text.len(),
        user.id
    );
    Ok(Json(ResumeTextResponse { resume_text }))
}
