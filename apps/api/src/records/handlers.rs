use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{
    ApplicationRecord, ApplicationStats, ApplicationStatus, ApplicationUpdate, NewApplication,
    RecordFilter,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListApplicationsQuery {
    pub user_id: Uuid,
    pub status: Option<ApplicationStatus>,
    /// Search over company, position and notes.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub application: NewApplication,
}

#[derive(Debug, Serialize)]
pub struct CreateApplicationResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub update: ApplicationUpdate,
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// GET /api/v1/applications?user_id=&status=&q=
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(params): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    let filter = RecordFilter {
        status: params.status,
        search: params.q,
    };
    Ok(Json(
        state.records.find_records(params.user_id, &filter).await?,
    ))
}

/// GET /api/v1/applications/stats
pub async fn handle_application_stats(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ApplicationStats>, AppError> {
    Ok(Json(state.records.application_stats(params.user_id).await?))
}

/// POST /api/v1/applications
///
/// Manual entry. Always available, including when automation is not.
pub async fn handle_create_application(
    State(state): State<AppState>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<CreateApplicationResponse>), AppError> {
    let application = request.application;
    require_text("company_name", &application.company_name)?;
    require_text("position", &application.position)?;

    let id = state.records.add_record(request.user_id, &application).await?;
    Ok((StatusCode::CREATED, Json(CreateApplicationResponse { id })))
}

/// PATCH /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateApplicationRequest>,
) -> Result<Json<ApplicationRecord>, AppError> {
    if let Some(company_name) = &request.update.company_name {
        require_text("company_name", company_name)?;
    }
    if let Some(position) = &request.update.position {
        require_text("position", position)?;
    }

    let record = state
        .records
        .update_record(request.user_id, id, &request.update)
        .await?;
    Ok(Json(record))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.records.delete_record(params.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
