// src/handlers/admin.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        submission::{BulkStatusPayload, BulkStatusResult, ResponsePayload, SubmissionListQuery},
        tenancy::UpdateTenantPayload,
    },
};

// GET /admin/dashboard
pub async fn get_dashboard(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.dashboard_service.get_stats().await?;
    Ok(Json(stats))
}

// GET /admin/submissions?status=&type=&q=&page=
pub async fn list_submissions(
    State(app_state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.submission_router.list(query).await?;
    Ok(Json(page))
}

// GET /admin/submissions/{id}
pub async fn get_submission(
    State(app_state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.submission_router.find_by_id(submission_id).await?;
    Ok(Json(detail))
}

// POST /admin/submissions/{id}/response
pub async fn create_response(
    State(app_state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(payload): Json<ResponsePayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .submission_router
        .create_response(submission_id, &payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// PUT /admin/submissions/{id}/response
pub async fn update_response(
    State(app_state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(payload): Json<ResponsePayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .submission_router
        .update_response(submission_id, &payload.body)
        .await?;
    Ok(Json(response))
}

// POST /admin/submissions/status
pub async fn set_status(
    State(app_state): State<AppState>,
    Json(payload): Json<BulkStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state
        .submission_router
        .set_status(&payload.ids, payload.status)
        .await?;
    Ok(Json(BulkStatusResult { updated }))
}

// GET /admin/tenants
pub async fn list_tenants(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tenants = app_state.tenant_directory.list().await?;
    Ok(Json(tenants))
}

// PATCH /admin/tenants/{id}
pub async fn update_tenant(
    State(app_state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = app_state.tenant_directory.update(tenant_id, payload).await?;
    Ok(Json(tenant))
}

// POST /admin/tenants/{id}/rotate-code
pub async fn rotate_access_code(
    State(app_state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = app_state.tenant_directory.rotate_access_code(tenant_id).await?;
    // O código novo vai por e-mail para o dono; a resposta não o carrega.
    Ok(Json(tenant))
}
