//! Axum route handlers for the Automation API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::orchestrator::{
    AutomationSnapshot, Intent, OrchestrationController, SessionContext, SessionHandle,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BackendStatusResponse {
    pub available: bool,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub user_id: Uuid,
    pub resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub snapshot: AutomationSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct ToggleSelectionRequest {
    pub job_url: String,
}

async fn session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Automation session {id} not found")))
}

async fn send_intent(
    state: &AppState,
    id: Uuid,
    intent: Intent,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = session(state, id).await?;
    let snapshot = handle.send(intent).await?;
    Ok(Json(SessionResponse {
        session_id: id,
        user_id: handle.user_id(),
        snapshot,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/automation/status
pub async fn handle_backend_status(State(state): State<AppState>) -> Json<BackendStatusResponse> {
    Json(BackendStatusResponse {
        available: state.automation.backends.probe.check_availability().await,
        base_url: state.config.automation.base_url.clone(),
    })
}

/// POST /api/v1/automation/sessions
///
/// Opens a workflow and runs the availability probe. The snapshot says
/// whether automation is offered or the user is limited to manual entry.
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let controller = OrchestrationController::new(
        state.automation.clone(),
        SessionContext {
            user_id: request.user_id,
            resume_url: request.resume_url,
            cover_letter_url: request.cover_letter_url,
        },
    );
    let (session_id, handle) = state.sessions.open(controller, request.user_id).await;

    let snapshot = handle.send(Intent::Initialize).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            user_id: request.user_id,
            snapshot,
        }),
    ))
}

/// GET /api/v1/automation/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = session(&state, id).await?;
    Ok(Json(SessionResponse {
        session_id: id,
        user_id: handle.user_id(),
        snapshot: handle.snapshot(),
    }))
}

/// DELETE /api/v1/automation/sessions/:id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Automation session {id} not found")))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/automation/sessions/:id/resume
///
/// Multipart upload with the file in field `resume`.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("resume") {
            continue;
        }
        let filename = field.file_name().unwrap_or("resume.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read resume upload: {e}")))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, resume) = upload
        .ok_or_else(|| AppError::Validation("multipart field 'resume' is required".to_string()))?;
    if resume.is_empty() {
        return Err(AppError::Validation("resume file is empty".to_string()));
    }

    send_intent(&state, id, Intent::SubmitResume { filename, resume }).await
}

/// POST /api/v1/automation/sessions/:id/search
pub async fn handle_search(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    send_intent(&state, id, Intent::StartSearch).await
}

/// POST /api/v1/automation/sessions/:id/selection
pub async fn handle_toggle_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ToggleSelectionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    send_intent(
        &state,
        id,
        Intent::ToggleSelection {
            apply_url: request.job_url,
        },
    )
    .await
}

/// PUT /api/v1/automation/sessions/:id/selection
pub async fn handle_select_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    send_intent(&state, id, Intent::SelectAll).await
}

/// DELETE /api/v1/automation/sessions/:id/selection
pub async fn handle_clear_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    send_intent(&state, id, Intent::ClearSelection).await
}

/// POST /api/v1/automation/sessions/:id/apply
///
/// Returns 202 once the selection is frozen; poll the session for progress.
pub async fn handle_start_apply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let response = send_intent(&state, id, Intent::StartApply).await?;
    Ok((StatusCode::ACCEPTED, response))
}

/// POST /api/v1/automation/sessions/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    send_intent(&state, id, Intent::Cancel).await
}
