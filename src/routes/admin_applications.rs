use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use crate::dto::admin_dto::{ApplicationListParams, SetStatusRequest, TenantFilterParams};
use crate::error::Result;
use crate::models::admin::Admin;
use crate::AppState;

/// GET /api/admin/applications
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Query(params): Query<ApplicationListParams>,
) -> Result<impl IntoResponse> {
    let list = state.application_service.list(&admin, &params).await?;
    Ok(Json(list))
}

/// GET /api/admin/applications/summary – dashboard KPI counts.
pub async fn application_summary(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Query(params): Query<TenantFilterParams>,
) -> Result<impl IntoResponse> {
    let summary = state
        .application_service
        .summary(&admin, params.tenant_id)
        .await?;
    Ok(Json(summary))
}

/// GET /api/admin/applications/export-csv
pub async fn export_applications_csv(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Query(params): Query<TenantFilterParams>,
) -> Result<impl IntoResponse> {
    let csv = state
        .application_service
        .export_csv(&admin, params.tenant_id)
        .await?;
    let filename = format!(
        "admin-dashboard-applications-{}.csv",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    ))
}

/// GET /api/admin/applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let view = state.application_service.get(&admin, id).await?;
    Ok(Json(view))
}

/// PATCH /api/admin/applications/:id – field patch; review metadata and
/// ownership keys are silently dropped from the body.
pub async fn update_application(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Path(id): Path<Uuid>,
    Json(body): Json<Map<String, JsonValue>>,
) -> Result<impl IntoResponse> {
    let view = state.application_service.patch(&admin, id, body).await?;
    Ok(Json(view))
}

/// DELETE /api/admin/applications/:id – hard delete.
pub async fn delete_application(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.application_service.delete(&admin, id).await?;
    Ok(Json(json!({ "id": id, "deleted": true })))
}

/// PATCH /api/admin/applications/:id/status – the review state machine.
pub async fn set_application_status(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .review_service
        .set_status(&admin, id, &payload.status, payload.message.as_deref())
        .await?;
    Ok(Json(outcome))
}
