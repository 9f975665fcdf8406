use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::dto::public_dto::{SubmitApplicationRequest, SubmitApplicationResponse};
use crate::error::Result;
use crate::models::application::{looks_like_email, ApplicationStatus};
use crate::AppState;

/// POST /api/public/applications – public submission endpoint.
///
/// The acknowledgement email is fire-and-forget: the response never waits
/// on SMTP and never fails because delivery did.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<SubmitApplicationRequest>,
) -> Result<impl IntoResponse> {
    let view = state
        .application_service
        .submit(
            payload.tenant_id,
            payload.role_id,
            payload.applicant_id,
            payload.fields,
        )
        .await?;
    tracing::info!(application_id = %view.application.id, tenant_id = %view.application.tenant_id, "Application submitted");

    if let Some(email) = view.application.applicant_email().filter(|e| looks_like_email(e)) {
        let notifications = state.notification_service.clone();
        let applicant_name = view.application.applicant_name();
        let tenant_name = view.tenant_name.clone().unwrap_or_else(|| "Company".to_string());
        let role_title = view.role_title.clone().unwrap_or_else(|| "the role".to_string());
        let application_id = view.application.id;
        tokio::spawn(async move {
            let ack = format!(
                "Hello {applicant_name},\n\nWe received your application for {role_title} at \
                 {tenant_name}. The team will review it and get back to you.\n\nBest regards,\n{tenant_name}"
            );
            let outcome = notifications
                .send_status_email(
                    &email,
                    &applicant_name,
                    &tenant_name,
                    &role_title,
                    ApplicationStatus::Approved,
                    Some(&ack),
                )
                .await;
            if !outcome.sent {
                tracing::warn!(
                    application_id = %application_id,
                    error = ?outcome.error,
                    "Submission acknowledgement email failed"
                );
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            id: view.application.id,
            status: view.application.status.as_str().to_string(),
        }),
    ))
}
